// src/lib.rs
//! Poll backend: polls with options, one vote per voter and poll, and live
//! tallies derived from the stored votes on every read.
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;
pub mod tally;
pub mod validation;

use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::feed::ChangeFeed;
use crate::services::PollService;
use crate::store::Store;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub polls: Arc<PollService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let feed = ChangeFeed::new(config.change_feed_capacity);
        Self {
            polls: Arc::new(PollService::new(store, feed)),
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    routes::create_routes(state)
}
