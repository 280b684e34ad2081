//! Input validation at the router level: structured 400s with the full
//! list of field failures

mod common;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
};
use tower::ServiceExt;

use common::{body_json, test_router};

fn post_json(uri: &str, client_ip: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn create_session_rejects_a_malformed_user_id() {
    let router = test_router().await;

    let response = router
        .oneshot(post_json(
            "/session/create",
            "198.51.100.1",
            serde_json::json!({ "userId": "not-a-uuid" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    let details = body["error"]["details"].as_array().unwrap();
    assert!(details
        .iter()
        .any(|d| d.as_str().unwrap().contains("UUID")));
}

#[tokio::test]
async fn phone_send_rejects_a_non_e164_number() {
    let router = test_router().await;

    let response = router
        .oneshot(post_json(
            "/phone/send",
            "198.51.100.2",
            serde_json::json!({ "phone_number": "555-1234" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn phone_send_accepts_the_camel_case_alias() {
    let router = test_router().await;

    // Valid number through the phoneNumber alias reaches the mock provider
    let response = router
        .oneshot(post_json(
            "/phone/send",
            "198.51.100.3",
            serde_json::json!({ "phoneNumber": "+15551234567" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["request_id"], "mock-request-id");
    assert_eq!(body["phone_number"], "+15551234567");
}

#[tokio::test]
async fn phone_check_rejects_an_out_of_range_code() {
    let router = test_router().await;

    let response = router
        .oneshot(post_json(
            "/phone/check",
            "198.51.100.4",
            serde_json::json!({ "phone_number": "+15551234567", "code": "12" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn id_verify_rejects_a_non_base64_image() {
    let router = test_router().await;

    let response = router
        .oneshot(post_json(
            "/id/verify",
            "198.51.100.5",
            serde_json::json!({
                "userId": "1f8373e1-6a17-4a28-a239-23a52e30f5f7",
                "frontImage": "!!!not-base64!!!"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn non_json_bodies_are_rejected_before_handlers() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/phone/check")
                .header(CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "198.51.100.6")
                .body(Body::from("this is not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "invalid_json");
}

#[tokio::test]
async fn health_reports_ok() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
