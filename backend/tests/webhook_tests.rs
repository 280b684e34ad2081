//! Webhook receiver contract tests: signature gating and the
//! always-ack-200 delivery policy

mod common;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
};
use tower::ServiceExt;

use backend::routes::webhook::SIGNATURE_HEADER;
use backend::webhook::sign;
use common::{body_json, test_router, TEST_WEBHOOK_SECRET};

fn approved_payload() -> String {
    serde_json::json!({
        "session_id": "sess-1",
        "status": "Approved",
        "vendor_data": "1f8373e1-6a17-4a28-a239-23a52e30f5f7",
        "webhook_type": "status.updated",
        "decision": {
            "id_verification": {"status": "Approved"},
            "phone_verification": {"status": "Approved", "phone_number": "+15551234567"}
        }
    })
    .to_string()
}

fn webhook_request(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn correctly_signed_webhook_is_acked() {
    let router = test_router().await;
    let body = approved_payload();
    let signature = sign(TEST_WEBHOOK_SECRET.as_bytes(), body.as_bytes());

    let response = router
        .oneshot(webhook_request(&body, &signature))
        .await
        .unwrap();

    // Processing may fail downstream (no local DynamoDB here); the ack
    // contract holds regardless
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let router = test_router().await;
    let body = approved_payload();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "invalid_signature");
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let router = test_router().await;
    let body = approved_payload();
    let signature = sign(TEST_WEBHOOK_SECRET.as_bytes(), body.as_bytes());

    // Alter the delivered body after signing
    let tampered = body.replace("Approved", "approved");
    assert_ne!(body, tampered);

    let response = router
        .oneshot(webhook_request(&tampered, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let router = test_router().await;
    let body = approved_payload();
    let mut signature = sign(TEST_WEBHOOK_SECRET.as_bytes(), body.as_bytes());

    // Mutate a single hex character
    let last = signature.pop().unwrap();
    signature.push(if last == '0' { '1' } else { '0' });

    let response = router
        .oneshot(webhook_request(&body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signature_from_a_different_secret_is_rejected() {
    let router = test_router().await;
    let body = approved_payload();
    let signature = sign(b"some_other_secret", body.as_bytes());

    let response = router
        .oneshot(webhook_request(&body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unparseable_but_authentic_payload_is_still_acked() {
    let router = test_router().await;
    let body = "not json at all";
    let signature = sign(TEST_WEBHOOK_SECRET.as_bytes(), body.as_bytes());

    let response = router
        .oneshot(webhook_request(body, &signature))
        .await
        .unwrap();

    // Authenticated garbage must not trigger provider redelivery
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
}

#[tokio::test]
async fn unknown_webhook_type_is_acked_and_ignored() {
    let router = test_router().await;
    let body = serde_json::json!({
        "session_id": "sess-1",
        "status": "Not Started",
        "vendor_data": "1f8373e1-6a17-4a28-a239-23a52e30f5f7",
        "webhook_type": "session.created"
    })
    .to_string();
    let signature = sign(TEST_WEBHOOK_SECRET.as_bytes(), body.as_bytes());

    let response = router
        .oneshot(webhook_request(&body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
