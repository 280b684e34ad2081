use std::sync::Arc;

use axum::{body::Bytes, http::HeaderMap, http::StatusCode, Extension, Json};
use chrono::Utc;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    cache::CorrelationCache,
    types::{AppError, Environment},
    webhook::{build_kyc_update, enables_trading, verify_signature, WebhookPayload},
};
use kyc_storage::user::UserStorage;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-didit-signature";

#[derive(Debug, Serialize, JsonSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Receives a provider callback.
///
/// The signature is verified over the exact raw body bytes before anything
/// is parsed. After that gate, the receiver always acks with 200 — a
/// processing failure here must not push the provider into a redelivery
/// storm, and redelivery of a processed callback is safe because every
/// update is a full overwrite keyed by `vendor_data`.
///
/// # Errors
///
/// - `401 invalid_signature` - Missing secret, missing header, or a
///   signature that does not match the body
pub async fn receive(
    Extension(environment): Extension<Environment>,
    Extension(user_storage): Extension<Arc<UserStorage>>,
    Extension(correlation_cache): Extension<Option<Arc<CorrelationCache>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let invalid_signature = || {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_signature",
            "Invalid webhook signature",
            false,
        )
    };

    let Some(secret) = environment.webhook_secret() else {
        tracing::error!("Webhook received but no signing secret is configured");
        return Err(invalid_signature());
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(invalid_signature)?;

    if !verify_signature(secret.as_bytes(), &body, signature) {
        tracing::warn!("Webhook signature mismatch");
        return Err(invalid_signature());
    }

    // Authenticated from here on: every outcome acks with 200
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Unparseable webhook payload: {e}");
            return Ok(Json(WebhookAck { received: true }));
        }
    };

    if let Err(e) = process(&payload, &user_storage, correlation_cache.as_deref()).await {
        tracing::error!(
            session_id = %payload.session_id,
            user_id = %payload.vendor_data,
            "Webhook processing failed: {e}"
        );
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Reconciles a verified callback into local state.
///
/// Cache interactions are best-effort throughout; only the user-row update
/// itself propagates an error (and that error is still swallowed into a
/// 200 by the caller).
async fn process(
    payload: &WebhookPayload,
    user_storage: &UserStorage,
    correlation_cache: Option<&CorrelationCache>,
) -> anyhow::Result<()> {
    if let Some(cache) = correlation_cache {
        match cache.get_session(&payload.session_id).await {
            Ok(Some(entry)) => {
                if entry.user_id == payload.vendor_data {
                    tracing::debug!(
                        correlation_id = %entry.correlation_id,
                        "Webhook correlated to cached session"
                    );
                } else {
                    tracing::warn!(
                        cached = %entry.user_id,
                        vendor_data = %payload.vendor_data,
                        "Cached correlation disagrees with vendor_data; trusting vendor_data"
                    );
                }
            }
            Ok(None) => {
                tracing::debug!(
                    session_id = %payload.session_id,
                    "No correlation entry for session (expired or never cached)"
                );
            }
            Err(e) => tracing::warn!("Correlation cache lookup failed: {e}"),
        }
    }

    if let Some(update) = build_kyc_update(payload, Utc::now().timestamp()) {
        user_storage
            .apply_kyc_update(&payload.vendor_data, &update)
            .await?;
    }

    if payload.status.is_terminal() {
        if let Some(cache) = correlation_cache {
            if let Err(e) = cache.delete_session(&payload.session_id).await {
                tracing::warn!("Failed to drop correlation entry: {e}");
            }
        }
    }

    if enables_trading(payload) {
        // Best-effort side effect: never blocks the ack
        if let Err(e) = user_storage.set_trading_enabled(&payload.vendor_data).await {
            tracing::error!(
                user_id = %payload.vendor_data,
                "Failed to enable trading after approval: {e}"
            );
        }
    }

    Ok(())
}
