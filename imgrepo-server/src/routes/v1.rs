use axum::{
    Router,
    routing::{get, post},
};
use imgrepo_model::routes::v1;

use crate::{
    handlers::{auth, images},
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        // Public authentication endpoints
        .route(v1::auth::REGISTER, post(auth::register))
        .route(v1::auth::LOGIN, post(auth::login))
        // Upload authenticates from the header frame; the rest use bearer tokens
        .route(
            v1::images::COLLECTION,
            post(images::upload_image).get(images::list_images),
        )
        .route(v1::images::ITEM, get(images::download_image))
}
