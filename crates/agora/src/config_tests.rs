// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::Config;

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn defaults_are_valid() -> anyhow::Result<()> {
    let config = parse(&["agora"]);
    config.validate()?;
    assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    assert_eq!(config.queue_capacity, 256);
    assert_eq!(config.ping_interval(), Some(Duration::from_secs(30)));
    assert_eq!(config.idle_timeout(), Some(Duration::from_secs(60)));
    assert_eq!(config.log_format, "text");
    Ok(())
}

#[test]
fn zero_disables_heartbeat() -> anyhow::Result<()> {
    let config = parse(&["agora", "--ping-interval-ms", "0", "--idle-timeout-ms", "0"]);
    config.validate()?;
    let settings = config.live_settings();
    assert_eq!(settings.ping_interval, None);
    assert_eq!(settings.idle_timeout, None);
    Ok(())
}

#[test]
fn idle_timeout_alone_is_allowed() -> anyhow::Result<()> {
    let config = parse(&["agora", "--ping-interval-ms", "0", "--idle-timeout-ms", "500"]);
    config.validate()?;
    assert_eq!(config.idle_timeout(), Some(Duration::from_millis(500)));
    Ok(())
}

#[yare::parameterized(
    zero_capacity   = { &["agora", "--queue-capacity", "0"], "greater than zero" },
    idle_below_ping = { &["agora", "--ping-interval-ms", "1000", "--idle-timeout-ms", "500"],
                        "must exceed" },
    idle_equal_ping = { &["agora", "--ping-interval-ms", "1000", "--idle-timeout-ms", "1000"],
                        "must exceed" },
    bad_log_format  = { &["agora", "--log-format", "yaml"], "invalid log format" },
    bad_origin      = { &["agora", "--cors-origin", "bad\norigin"], "invalid --cors-origin" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}

#[test]
fn test_config_is_valid() -> anyhow::Result<()> {
    Config::test().validate()?;
    Ok(())
}
