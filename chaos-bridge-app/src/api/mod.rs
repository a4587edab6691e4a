//! HTTP surface for the chat front end and the in-game poller.

mod router;
mod routes;
pub mod types;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chaos_bridge_core::{Dispatcher, IntakeOutcome, PreferencesUpdate};
use routes::*;
use std::sync::Arc;
use types::*;

pub use router::build_router;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Reported by `/scan_test` for blocked links.
    pub placeholder_url: Arc<str>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, placeholder_url: impl Into<Arc<str>>) -> Self {
        Self {
            dispatcher,
            placeholder_url: placeholder_url.into(),
        }
    }
}
