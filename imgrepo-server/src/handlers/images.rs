use std::io;

use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::QueryRejection,
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use imgrepo_core::{
    RepoError,
    transfer::{chunk_count, encode_transfer, framed_reader},
};
use imgrepo_model::{
    ApiResponse, DownloadQuery, ImageID, ListQuery, ListResponse,
    TRANSFER_CONTENT_TYPE, UploadHeader, UploadResponse,
};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::{
    handlers::BearerToken,
    infra::{
        app_state::AppState,
        errors::{AppError, AppResult},
    },
};

/// Receive a framed upload. The session token travels in the header frame,
/// so this route takes no `Authorization` header.
pub async fn upload_image(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<(StatusCode, Json<ApiResponse<UploadResponse>>)> {
    let reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    let frames = framed_reader::<UploadHeader, _>(reader);

    let id = state.service.upload_image(frames).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UploadResponse { id })),
    ))
}

/// Stream an image back as header then chunks. Every failure is decided
/// before the body starts, so errors keep their JSON shape and status code.
pub async fn download_image(
    State(state): State<AppState>,
    token: BearerToken,
    Path(id): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let id: ImageID = id.parse().map_err(RepoError::from)?;

    let image = state
        .service
        .download_image(token.as_str(), query.requester.as_deref(), id)
        .await?;

    let chunks = chunk_count(image.data.len());
    info!(image_id = %id, bytes = image.data.len(), chunks, "streaming download");

    let body = Body::from_stream(encode_transfer(image.record, image.data));
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(TRANSFER_CONTENT_TYPE),
        )],
        body,
    )
        .into_response())
}

pub async fn list_images(
    State(state): State<AppState>,
    token: BearerToken,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<ListResponse>>> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    debug!(?query, "list images");

    let images = state
        .service
        .list_images(
            token.as_str(),
            query.requester.as_deref(),
            query.page_size.unwrap_or(0),
            query.cursor,
        )
        .await?;

    Ok(Json(ApiResponse::success(ListResponse { images })))
}
