// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::live::LiveHub;
use crate::store::Stores;

/// Shared application state passed to all handlers via axum `State` extractor.
#[derive(Debug)]
pub struct AppState {
    pub hub: Arc<LiveHub>,
    pub stores: Stores,
    /// Allowed browser origin; `None` allows any.
    pub cors_origin: Option<String>,
}

impl AppState {
    pub fn new(hub: Arc<LiveHub>, stores: Stores) -> Self {
        Self { hub, stores, cors_origin: None }
    }

    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }
}
