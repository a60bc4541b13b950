use axum::{Json, extract::State, http::StatusCode};
use imgrepo_model::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest};
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<()>>)> {
    state
        .service
        .register(&request.username, &request.password)
        .await?;
    info!(username = %request.username.trim(), "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(()).with_message("user registered".to_string())),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let token = state
        .service
        .login(&request.username, &request.password)
        .await?;

    let expires_in = token.expires_in();
    Ok(Json(ApiResponse::success(LoginResponse {
        token: token.into_string(),
        expires_in,
    })))
}
