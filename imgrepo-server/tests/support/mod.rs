#![allow(dead_code)]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use imgrepo_core::auth::AuthCrypto;
use imgrepo_core::transfer::{encode_transfer, framed_reader, receive_all, Received};
use imgrepo_model::{
    ApiResponse, DownloadHeader, LoginRequest, LoginResponse, RegisterRequest,
    UploadHeader, routes::v1,
};
use imgrepo_server::{
    AppState, create_app,
    infra::startup::{ServiceSettings, in_memory_service},
};

pub fn test_server() -> TestServer {
    test_server_with(ServiceSettings::default())
}

pub fn test_server_with(settings: ServiceSettings) -> TestServer {
    let crypto = Arc::new(
        AuthCrypto::with_minimal_cost("test-pepper", "test-token-key").unwrap(),
    );
    let service = in_memory_service(crypto, &settings);
    TestServer::new(create_app(AppState::new(service))).unwrap()
}

pub async fn register(server: &TestServer, username: &str, password: &str) {
    server
        .post(v1::auth::REGISTER)
        .json(&RegisterRequest {
            username: username.into(),
            password: password.into(),
        })
        .await
        .assert_status(StatusCode::CREATED);
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post(v1::auth::LOGIN)
        .json(&LoginRequest {
            username: username.into(),
            password: password.into(),
        })
        .await;
    response.assert_status_ok();
    let body: ApiResponse<LoginResponse> = response.json();
    body.data.unwrap().token
}

/// Register and log in a fresh user, returning the session token.
pub async fn signed_in(server: &TestServer, username: &str) -> String {
    register(server, username, "correct horse").await;
    login(server, username, "correct horse").await
}

/// Encode a full upload body: one header frame followed by the chunks.
pub async fn upload_body(header: UploadHeader, payload: Bytes) -> Bytes {
    let frames: Vec<Bytes> = encode_transfer(header, payload)
        .try_collect()
        .await
        .unwrap();
    let mut body = BytesMut::new();
    for frame in frames {
        body.extend_from_slice(&frame);
    }
    body.freeze()
}

pub async fn decode_download(body: &[u8]) -> Received<DownloadHeader> {
    receive_all(framed_reader::<DownloadHeader, _>(body), usize::MAX)
        .await
        .unwrap()
}
