// routes.rs
use axum::{
    routing::{delete, get, post},
    Router,
};
use http::{header, HeaderName, HeaderValue, Method};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers;
use crate::session::{USER_EMAIL_HEADER, USER_ID_HEADER};
use crate::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/api/polls", get(handlers::list_polls).post(handlers::create_poll))
        .route("/api/polls/{id}", delete(handlers::delete_poll))
        .route("/api/votes", post(handlers::vote))
        .route("/api/me", get(handlers::me))
        .route(
            "/api/profile",
            post(handlers::create_profile).put(handlers::update_profile),
        )
        .route("/api/changes", get(handlers::changes))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_EMAIL_HEADER),
        ]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            warn!("ignoring unusable CORS_ORIGIN: {e}");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
