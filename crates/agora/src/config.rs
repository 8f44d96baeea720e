// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::live::LiveSettings;

/// Live chat and notification push server.
#[derive(Debug, Clone, Parser)]
#[command(name = "agora", version, about)]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "AGORA_HOST")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, default_value_t = 8080, env = "AGORA_PORT")]
    pub port: u16,

    /// Maximum pending events per connection before the oldest is dropped.
    #[arg(long, default_value_t = 256, env = "AGORA_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Server ping interval in milliseconds (0 disables pings).
    #[arg(long, default_value_t = 30_000, env = "AGORA_PING_INTERVAL_MS")]
    pub ping_interval_ms: u64,

    /// Close a connection after this many milliseconds without an inbound
    /// frame (0 disables).
    #[arg(long, default_value_t = 60_000, env = "AGORA_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    /// Allowed browser origin. If unset, any origin is allowed.
    #[arg(long, env = "AGORA_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// JSON fixture seeding the in-memory store.
    #[arg(long, env = "AGORA_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "AGORA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AGORA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_capacity == 0 {
            anyhow::bail!("--queue-capacity must be greater than zero");
        }

        if let (Some(ping), Some(idle)) = (self.ping_interval(), self.idle_timeout()) {
            if idle <= ping {
                anyhow::bail!(
                    "--idle-timeout-ms ({}) must exceed --ping-interval-ms ({})",
                    idle.as_millis(),
                    ping.as_millis()
                );
            }
        }

        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other} (expected json or text)"),
        }

        if let Some(ref origin) = self.cors_origin {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                anyhow::bail!("invalid --cors-origin: {origin}");
            }
        }

        Ok(())
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings {
            queue_capacity: self.queue_capacity,
            ping_interval: self.ping_interval(),
            idle_timeout: self.idle_timeout(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build a minimal `Config` for tests (port 0, heartbeat disabled).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            queue_capacity: 64,
            ping_interval_ms: 0,
            idle_timeout_ms: 0,
            cors_origin: None,
            fixtures: None,
            log_format: "text".into(),
            log_level: "debug".into(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
