use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod datasets;
pub mod session;

pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(datasets::routes(&state.config))
        .merge(session::routes())
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
