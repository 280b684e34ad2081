use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    cache::{CorrelationCache, CorrelationEntry, SESSION_TTL_SECS},
    provider::VerificationApi,
    routes::validators::{validate_phone_number, validate_user_id},
    types::{AppError, ValidatedJson},
};
use kyc_storage::user::{KycStatus, NewUser, UserStorage};

/// Total session-creation attempts a user gets: the first one plus two
/// retries. The bound is enforced atomically by the store.
pub const MAX_VERIFICATION_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Internal user id, carried to the provider as `vendor_data`
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    /// Pre-filled contact details for the verification flow
    #[validate(nested)]
    pub contact_details: Option<ContactDetails>,
    /// Expected document holder details, passed through to the provider
    pub expected_details: Option<Value>,
    /// Free-form metadata echoed back in webhooks
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateSessionResponse {
    /// Provider session id, absent on the already-verified short-circuit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Hosted verification URL the end user is sent to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_url: Option<String>,
    /// Provider session status, or the local terminal status
    pub status: String,
    /// Lifetime of the correlation entry in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(rename = "retriesUsed")]
    pub retries_used: u32,
    #[serde(rename = "retriesRemaining")]
    pub retries_remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Creates a verification session for a user.
///
/// The user row is created lazily on first contact. A user whose status is
/// already terminal gets a non-error short-circuit and no provider call; a
/// user at the retry bound gets a 429. The attempt slot is consumed with an
/// atomic conditional increment before the provider is called, so two
/// concurrent requests cannot both squeeze past the bound.
///
/// # Errors
///
/// - `429 retries_exceeded` - The retry bound is reached
/// - `400/401/404/429/502` - Mapped provider failures
/// - `503 database_error` - Storage unavailable
pub async fn create_session(
    Extension(user_storage): Extension<Arc<UserStorage>>,
    Extension(correlation_cache): Extension<Option<Arc<CorrelationCache>>>,
    Extension(provider): Extension<Arc<dyn VerificationApi>>,
    ValidatedJson(request): ValidatedJson<CreateSessionRequest>,
) -> Result<Response, AppError> {
    let (email, phone_number) = request.contact_details.as_ref().map_or((None, None), |c| {
        (c.email.clone(), c.phone_number.clone())
    });

    let user = user_storage
        .get_or_create(NewUser {
            user_id: request.user_id.clone(),
            email,
            phone_number,
        })
        .await?;

    if user.kyc_status == KycStatus::Verified {
        let response = CreateSessionResponse {
            session_id: None,
            session_token: None,
            verification_url: None,
            status: KycStatus::Verified.to_string(),
            expires_in: None,
            retries_used: user.verification_retries,
            retries_remaining: MAX_VERIFICATION_ATTEMPTS
                .saturating_sub(user.verification_retries),
            message: Some("User has already completed verification".to_string()),
        };
        return Ok(Json(response).into_response());
    }

    if user.verification_retries >= MAX_VERIFICATION_ATTEMPTS {
        return Err(AppError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "retries_exceeded",
            "Maximum verification attempts reached",
            false,
        ));
    }

    // Consume the attempt slot first; the conditional update is what
    // actually enforces the bound under concurrency
    let retries_used = user_storage
        .record_verification_attempt(&request.user_id, MAX_VERIFICATION_ATTEMPTS)
        .await?;

    let contact_details = request
        .contact_details
        .as_ref()
        .map(|contact| serde_json::to_value(contact))
        .transpose()
        .map_err(|_| {
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
                false,
            )
        })?;

    let session = provider
        .create_session(
            &request.user_id,
            contact_details,
            request.expected_details,
            request.metadata,
        )
        .await?;

    // Best-effort: the webhook can always correlate through vendor_data
    if let Some(cache) = correlation_cache {
        let entry = CorrelationEntry::new(request.user_id.clone(), Uuid::new_v4().to_string());
        if let Err(e) = cache.store_session(&session.session_id, &entry).await {
            tracing::warn!(
                session_id = %session.session_id,
                "Failed to cache session correlation: {e}"
            );
        }
    }

    let response = CreateSessionResponse {
        session_id: Some(session.session_id),
        session_token: session.session_token,
        verification_url: Some(session.url),
        status: session.status,
        expires_in: Some(SESSION_TTL_SECS),
        retries_used,
        retries_remaining: MAX_VERIFICATION_ATTEMPTS.saturating_sub(retries_used),
        message: None,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Returns the provider's session object verbatim
///
/// # Errors
///
/// - `404 not_found` - The provider does not know the session
/// - `400/401/429/502` - Other mapped provider failures
pub async fn get_session(
    Extension(provider): Extension<Arc<dyn VerificationApi>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = provider.retrieve_session(&session_id).await?;
    Ok(Json(session))
}
