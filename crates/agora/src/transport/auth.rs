// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::error::ApiError;
use crate::model::{SessionId, UserId};
use crate::store::AuthError;
use crate::transport::state::AppState;

/// Name of the login session cookie.
pub const SESSION_COOKIE: &str = "session_token";

/// Extract the session token from the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingCookie)
}

/// The logged-in user behind a request.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub token: String,
}

/// Resolve the request's session cookie against the session store.
pub async fn resolve_viewer(state: &AppState, headers: &HeaderMap) -> Result<Viewer, AuthError> {
    let token = session_token(headers)?;
    let (user_id, session_id) = state.stores.sessions.resolve(token).await?;
    Ok(Viewer { user_id, session_id, token: token.to_owned() })
}

impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(resolve_viewer(state, &parts.headers).await?)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
