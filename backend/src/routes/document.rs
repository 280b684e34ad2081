use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;
use validator::Validate;

use crate::{
    provider::{DocumentVerification, VerificationApi},
    routes::validators::{validate_base64_image, validate_user_id},
    types::{AppError, ValidatedJson},
};
use kyc_storage::user::{KycUpdate, NewUser, UserStorage};

/// Document kinds the provider accepts
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Passport,
    IdCard,
    DriversLicense,
    ResidencePermit,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDocumentRequest {
    /// Internal user id the result is recorded against
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    /// Base64-encoded front image of the document
    #[validate(custom(function = "validate_base64_image"))]
    pub front_image: String,
    /// Base64-encoded back image, required for two-sided documents
    #[validate(custom(function = "validate_base64_image"))]
    pub back_image: Option<String>,
    /// Document kind hint for the provider
    pub document_type: Option<DocumentType>,
}

/// Verifies an identity document synchronously.
///
/// The normalized provider result is returned to the caller; a verified
/// outcome also marks the user's document as verified and overwrites the
/// stored details blob.
///
/// # Errors
///
/// - `400/401/429/502` - Mapped provider failures
/// - `503 database_error` - Storage unavailable
pub async fn verify_document(
    Extension(user_storage): Extension<Arc<UserStorage>>,
    Extension(provider): Extension<Arc<dyn VerificationApi>>,
    ValidatedJson(request): ValidatedJson<VerifyDocumentRequest>,
) -> Result<Json<DocumentVerification>, AppError> {
    let result = provider
        .verify_document(
            &request.front_image,
            request.back_image.as_deref(),
            request
                .document_type
                .map(|t| t.to_string())
                .as_deref(),
        )
        .await?;

    if result.is_approved() {
        user_storage
            .get_or_create(NewUser {
                user_id: request.user_id.clone(),
                email: None,
                phone_number: None,
            })
            .await?;

        let update = KycUpdate {
            id_verified: Some(true),
            kyc_details: serde_json::to_string(&result).ok(),
            ..KycUpdate::default()
        };
        user_storage
            .apply_kyc_update(&request.user_id, &update)
            .await?;
    }

    Ok(Json(result))
}
