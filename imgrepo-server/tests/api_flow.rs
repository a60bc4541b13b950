mod support;

use axum::http::StatusCode;
use bytes::Bytes;
use imgrepo_model::{
    ApiResponse, ErrorBody, ErrorKind, ListResponse, NewImage,
    TRANSFER_CONTENT_TYPE, UploadHeader, UploadResponse, Visibility, routes,
};
use imgrepo_server::infra::startup::ServiceSettings;

use support::*;

async fn upload(
    server: &axum_test::TestServer,
    token: &str,
    image: NewImage,
    payload: Bytes,
) -> axum_test::TestResponse {
    let body = upload_body(UploadHeader::new(token.to_string(), image), payload).await;
    server
        .post(routes::v1::images::COLLECTION)
        .content_type(TRANSFER_CONTENT_TYPE)
        .bytes(body)
        .await
}

fn error_kind(response: &axum_test::TestResponse) -> ErrorKind {
    response.json::<ErrorBody>().error.kind
}

#[tokio::test]
async fn health_reports_ok() {
    let server = test_server();
    let response = server.get(routes::HEALTH).await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[tokio::test]
async fn upload_then_download_round_trips_bytes() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;

    // Spans three chunks, the last one partial.
    let payload: Bytes = (0..300_001u32).map(|i| (i % 251) as u8).collect();
    let response = upload(
        &server,
        &token,
        NewImage::new("cat.png", "alice", Visibility::Private),
        payload.clone(),
    )
    .await;
    response.assert_status(StatusCode::CREATED);
    let id = response
        .json::<ApiResponse<UploadResponse>>()
        .data
        .unwrap()
        .id;

    let response = server
        .get(&routes::v1::images::item(id))
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        TRANSFER_CONTENT_TYPE
    );

    let received = decode_download(response.as_bytes()).await;
    assert_eq!(received.header.id, id);
    assert_eq!(received.header.name, "cat.png");
    assert_eq!(received.header.owner, "alice");
    assert_eq!(received.chunks, 3);
    assert_eq!(received.payload, payload);
}

#[tokio::test]
async fn empty_payload_uploads_and_downloads() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;

    let response = upload(
        &server,
        &token,
        NewImage::new("empty.bin", "", Visibility::Public),
        Bytes::new(),
    )
    .await;
    response.assert_status(StatusCode::CREATED);
    let id = response
        .json::<ApiResponse<UploadResponse>>()
        .data
        .unwrap()
        .id;

    let response = server
        .get(&routes::v1::images::item(id))
        .authorization_bearer(&token)
        .await;
    let received = decode_download(response.as_bytes()).await;
    assert_eq!(received.header.owner, "alice");
    assert!(received.payload.is_empty());
    assert_eq!(received.chunks, 0);
}

#[tokio::test]
async fn upload_with_invalid_token_is_rejected() {
    let server = test_server();
    let response = upload(
        &server,
        "not-a-session",
        NewImage::new("cat.png", "alice", Visibility::Public),
        Bytes::from_static(b"meow"),
    )
    .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_kind(&response), ErrorKind::Authentication);
}

#[tokio::test]
async fn upload_for_another_owner_is_forbidden() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;
    let response = upload(
        &server,
        &token,
        NewImage::new("cat.png", "bob", Visibility::Public),
        Bytes::from_static(b"meow"),
    )
    .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_kind(&response), ErrorKind::Authorization);
}

#[tokio::test]
async fn oversized_upload_is_a_validation_error() {
    let server = test_server_with(ServiceSettings {
        max_image_bytes: 16,
        ..ServiceSettings::default()
    });
    let token = signed_in(&server, "alice").await;
    let response = upload(
        &server,
        &token,
        NewImage::new("big.bin", "alice", Visibility::Public),
        Bytes::from(vec![7u8; 64]),
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&response), ErrorKind::Validation);
}

#[tokio::test]
async fn truncated_transfer_body_is_rejected() {
    let server = test_server();
    let response = server
        .post(routes::v1::images::COLLECTION)
        .content_type(TRANSFER_CONTENT_TYPE)
        .bytes(Bytes::from_static(&[0, 0, 0, 9, 0x01, b'{']))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn private_images_are_hidden_from_other_users() {
    let server = test_server();
    let alice = signed_in(&server, "alice").await;
    let bob = signed_in(&server, "bob").await;

    let response = upload(
        &server,
        &alice,
        NewImage::new("secret.png", "alice", Visibility::Private),
        Bytes::from_static(b"hidden"),
    )
    .await;
    let id = response
        .json::<ApiResponse<UploadResponse>>()
        .data
        .unwrap()
        .id;

    let response = server
        .get(&routes::v1::images::item(id))
        .authorization_bearer(&bob)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_kind(&response), ErrorKind::Authorization);

    let response = server
        .get(routes::v1::images::COLLECTION)
        .authorization_bearer(&bob)
        .await;
    response.assert_status_ok();
    let page = response.json::<ApiResponse<ListResponse>>().data.unwrap();
    assert!(page.images.is_empty());
}

#[tokio::test]
async fn download_requires_bearer_token() {
    let server = test_server();
    let response = server
        .get(&routes::v1::images::item(imgrepo_model::ImageID::new()))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn download_of_unknown_id_is_not_found() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;
    let response = server
        .get(&routes::v1::images::item(imgrepo_model::ImageID::new()))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&response), ErrorKind::NotFound);
}

#[tokio::test]
async fn download_with_malformed_id_is_bad_request() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;
    let response = server
        .get("/api/v1/images/not-a-uuid")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&response), ErrorKind::Validation);
}

#[tokio::test]
async fn list_pages_newest_first_with_cursor() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;

    let mut ids = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        let response = upload(
            &server,
            &token,
            NewImage::new(name, "alice", Visibility::Public),
            Bytes::from_static(b"x"),
        )
        .await;
        ids.push(
            response
                .json::<ApiResponse<UploadResponse>>()
                .data
                .unwrap()
                .id,
        );
    }

    let first = server
        .get(routes::v1::images::COLLECTION)
        .authorization_bearer(&token)
        .add_query_param("page_size", 2)
        .await
        .json::<ApiResponse<ListResponse>>()
        .data
        .unwrap();
    let names: Vec<_> = first.images.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["e", "d"]);

    let cursor = first.next_cursor().unwrap();
    let second = server
        .get(routes::v1::images::COLLECTION)
        .authorization_bearer(&token)
        .add_query_param("page_size", 2)
        .add_query_param("cursor", cursor.to_string())
        .await
        .json::<ApiResponse<ListResponse>>()
        .data
        .unwrap();
    let names: Vec<_> = second.images.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["c", "b"]);

    // An empty cursor restarts from the newest item.
    let restarted = server
        .get(routes::v1::images::COLLECTION)
        .authorization_bearer(&token)
        .add_query_param("page_size", 1)
        .add_query_param("cursor", "")
        .await
        .json::<ApiResponse<ListResponse>>()
        .data
        .unwrap();
    assert_eq!(restarted.images[0].id, ids[4]);
}

#[tokio::test]
async fn list_for_another_requester_is_forbidden() {
    let server = test_server();
    let token = signed_in(&server, "alice").await;
    let response = server
        .get(routes::v1::images::COLLECTION)
        .authorization_bearer(&token)
        .add_query_param("requester", "bob")
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let server = test_server();
    register(&server, "alice", "pw-one").await;
    let response = server
        .post(routes::v1::auth::REGISTER)
        .json(&imgrepo_model::RegisterRequest {
            username: "alice".into(),
            password: "pw-two".into(),
        })
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_kind(&response), ErrorKind::Duplicate);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_identical() {
    let server = test_server();
    register(&server, "alice", "right").await;

    let mut bodies = Vec::new();
    for (username, password) in [("alice", "wrong"), ("mallory", "right")] {
        let response = server
            .post(routes::v1::auth::LOGIN)
            .json(&imgrepo_model::LoginRequest {
                username: username.into(),
                password: password.into(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        bodies.push(response.json::<ErrorBody>().error);
    }
    assert_eq!(bodies[0].kind, ErrorKind::Credential);
    assert_eq!(bodies[0].kind, bodies[1].kind);
    assert_eq!(bodies[0].message, bodies[1].message);
}
