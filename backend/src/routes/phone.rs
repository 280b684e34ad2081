use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    cache::{CorrelationCache, CorrelationEntry},
    provider::VerificationApi,
    routes::validators::{validate_phone_number, validate_user_id},
    types::{AppError, ValidatedJson},
};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
pub struct SendCodeRequest {
    /// Phone number in E.164 format
    #[serde(alias = "phoneNumber")]
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    /// Internal user id; when present the request id is cached against it
    #[serde(default, alias = "userId")]
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
pub struct CheckCodeRequest {
    /// Phone number in E.164 format
    #[serde(alias = "phoneNumber")]
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    /// One-time code the user received
    #[validate(length(min = 4, max = 10))]
    pub code: String,
}

/// Sends a one-time code to a phone number.
///
/// The provider response is passed through verbatim. When the caller
/// supplied a user id, the returned request id is cached against it with
/// the short phone-code TTL, best-effort.
///
/// # Errors
///
/// - `400/401/429/502` - Mapped provider failures
pub async fn send_code(
    Extension(correlation_cache): Extension<Option<Arc<CorrelationCache>>>,
    Extension(provider): Extension<Arc<dyn VerificationApi>>,
    ValidatedJson(request): ValidatedJson<SendCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let response = provider.send_phone_code(&request.phone_number).await?;

    if let (Some(cache), Some(user_id)) = (correlation_cache, request.user_id) {
        if let Some(request_id) = response.get("request_id").and_then(Value::as_str) {
            let entry = CorrelationEntry::new(user_id, Uuid::new_v4().to_string());
            if let Err(e) = cache.store_phone_request(request_id, &entry).await {
                tracing::warn!(request_id, "Failed to cache phone correlation: {e}");
            }
        }
    }

    Ok(Json(response))
}

/// Checks a one-time code against the provider.
///
/// The provider's validity object is returned verbatim; the durable
/// `phone_verified` flag is only ever set by the webhook decision.
///
/// # Errors
///
/// - `400/401/429/502` - Mapped provider failures
pub async fn check_code(
    Extension(provider): Extension<Arc<dyn VerificationApi>>,
    ValidatedJson(request): ValidatedJson<CheckCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let result = provider
        .check_phone_code(&request.phone_number, &request.code)
        .await?;
    Ok(Json(result))
}
