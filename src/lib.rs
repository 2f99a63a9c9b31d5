//! Library entrypoint for ClosetMarket's checkout service.
//!
//! The binary only wires configuration and a store backend into
//! [`routes::app`]; everything else lives here so integration tests under
//! `tests/` can drive the services and the router directly.

use std::sync::Arc;

use tokio::sync::broadcast;

pub mod config;
pub mod error;
pub mod models;

// Keep the middleware at crate root as `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;
pub mod events;

pub mod controllers;
pub mod routes;

use services::store::DocumentStore;

pub use services::checkout_session::Sessions;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub settings: config::Settings,
    pub sessions: Sessions,
    pub events_tx: broadcast::Sender<events::UserEvent>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, settings: config::Settings) -> Self {
        let (events_tx, _events_rx) = broadcast::channel::<events::UserEvent>(64);
        AppState {
            store,
            settings,
            sessions: Sessions::new(),
            events_tx,
        }
    }
}
