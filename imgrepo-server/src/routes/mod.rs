pub mod v1;

use axum::{Router, routing::get};
use imgrepo_model::routes::HEALTH;
use tower_http::trace::TraceLayer;

use crate::{handlers::health::health, infra::app_state::AppState};

/// Create the full application router: health probe, versioned API and
/// request tracing.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(HEALTH, get(health))
        .merge(v1::create_v1_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
