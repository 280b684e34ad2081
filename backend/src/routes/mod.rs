mod docs;
pub mod document;
pub mod health;
pub mod phone;
pub mod session;
pub mod status;
pub mod validators;
pub mod webhook;

use std::sync::Arc;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::middleware::from_fn_with_state;

use crate::middleware::{enforce_rate_limit, RateLimitConfig, RateLimiter};

fn limiter(max_per_minute: u32) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimitConfig::per_minute(max_per_minute)))
}

/// Creates the router with all handler routes.
///
/// Every verification route carries its own fixed-window limiter, applied
/// before validation and handler logic. The webhook and health endpoints
/// are unlimited: the webhook is authenticated by signature and the
/// provider must never be throttled into redelivery loops.
pub fn handler() -> ApiRouter {
    let session_create = ApiRouter::new()
        .route(
            "/session/create",
            axum::routing::post(session::create_session),
        )
        .layer(from_fn_with_state(limiter(5), enforce_rate_limit));

    let session_get = ApiRouter::new()
        .api_route("/session/{session_id}", get(session::get_session))
        .layer(from_fn_with_state(limiter(30), enforce_rate_limit));

    let phone_send = ApiRouter::new()
        .api_route("/phone/send", post(phone::send_code))
        .layer(from_fn_with_state(limiter(5), enforce_rate_limit));

    let phone_check = ApiRouter::new()
        .api_route("/phone/check", post(phone::check_code))
        .layer(from_fn_with_state(limiter(10), enforce_rate_limit));

    let id_verify = ApiRouter::new()
        .api_route("/id/verify", post(document::verify_document))
        .layer(from_fn_with_state(limiter(5), enforce_rate_limit));

    let status_routes = ApiRouter::new()
        .api_route("/status/{user_id}", get(status::get_status))
        .layer(from_fn_with_state(limiter(30), enforce_rate_limit));

    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .route("/webhook", axum::routing::post(webhook::receive))
        .merge(session_create)
        .merge(session_get)
        .merge(phone_send)
        .merge(phone_check)
        .merge(id_verify)
        .merge(status_routes)
}
