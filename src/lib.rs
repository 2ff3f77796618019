// src/lib.rs
//
// Token-gated scheduling-poll backend: an organizer creates a poll and gets
// an opaque link token; everyone holding the token can read the poll, join
// it, and submit availability blocks. No accounts, no sessions: possession
// of the token is the whole access model.
use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod token;
pub mod validate;

use error::ApiError;
use store::Store;

/// Shared handler state. `None` means the backing store was never
/// configured; every request then reports the configuration error instead
/// of the process refusing to start.
#[derive(Clone, Default)]
pub struct AppState {
    store: Option<Arc<dyn Store>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        AppState { store: Some(store) }
    }

    pub fn unconfigured() -> Self {
        AppState::default()
    }

    pub fn store(&self) -> Result<&dyn Store, ApiError> {
        self.store.as_deref().ok_or(ApiError::Configuration)
    }
}
