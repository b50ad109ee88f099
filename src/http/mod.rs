// src/http/mod.rs

pub mod repos;

use std::sync::Arc;

use axum::Router;

use crate::metrics::ShaTracker;
use crate::staging::Transfer;

/// The process-wide router: staging channel plus introspection.
pub fn build_router(transfer: &Transfer, tracker: Arc<ShaTracker>) -> Router {
    Router::new()
        .merge(transfer.router())
        .merge(repos::router(tracker))
}
