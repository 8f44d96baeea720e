// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::HeaderValue;

use super::*;
use crate::live::{LiveHub, LiveSettings};
use crate::store::{MemoryStore, Stores};

fn headers(cookies: &[&str]) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        headers.append(header::COOKIE, HeaderValue::from_str(cookie)?);
    }
    Ok(headers)
}

#[yare::parameterized(
    only        = { &["session_token=abc"], "abc" },
    among_many  = { &["theme=dark; session_token=abc; lang=en"], "abc" },
    second_hdr  = { &["theme=dark", "session_token=abc"], "abc" },
    quoted      = { &["session_token=\"abc\""], "abc" },
    spaced      = { &["theme=dark;   session_token=abc  "], "abc" },
)]
fn finds_session_cookie(cookies: &[&str], expected: &str) -> anyhow::Result<()> {
    let headers = headers(cookies)?;
    assert_eq!(session_token(&headers).map_err(|e| anyhow::anyhow!("{e}"))?, expected);
    Ok(())
}

#[yare::parameterized(
    no_header   = { &[] },
    other_only  = { &["theme=dark"] },
    empty_value = { &["session_token="] },
    prefix_name = { &["xsession_token=abc"] },
)]
fn missing_session_cookie(cookies: &[&str]) -> anyhow::Result<()> {
    let headers = headers(cookies)?;
    assert!(matches!(session_token(&headers), Err(AuthError::MissingCookie)));
    Ok(())
}

#[tokio::test]
async fn resolves_known_session() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let token = store.login(UserId(7));
    let stores = Stores::memory(store);
    let hub = Arc::new(LiveHub::new(&stores, LiveSettings::default()));
    let state = AppState::new(hub, stores);

    let viewer = resolve_viewer(&state, &headers(&[&format!("session_token={token}")])?)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(viewer.user_id, UserId(7));
    assert_eq!(viewer.token, token);

    let unknown = resolve_viewer(&state, &headers(&["session_token=forged"])?).await;
    assert!(matches!(unknown, Err(AuthError::InvalidSession)));
    Ok(())
}
