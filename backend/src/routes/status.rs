use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{routes::session::MAX_VERIFICATION_ATTEMPTS, types::AppError};
use kyc_storage::user::{KycStatus, User, UserStorage};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub user_id: String,
    pub kyc_status: KycStatus,
    pub id_verified: bool,
    pub phone_verified: bool,
    pub verification_retries: u32,
    pub retries_remaining: u32,
    /// Epoch seconds of the last session-creation call
    pub last_attempt: Option<i64>,
    pub trading_enabled: bool,
    /// Epoch seconds of the VERIFIED transition
    pub completed_at: Option<i64>,
    /// Masked: only the last 4 digits are echoed back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<User> for StatusResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            kyc_status: user.kyc_status,
            id_verified: user.id_verified,
            phone_verified: user.phone_verified,
            verification_retries: user.verification_retries,
            retries_remaining: MAX_VERIFICATION_ATTEMPTS
                .saturating_sub(user.verification_retries),
            last_attempt: user.last_verification_attempt,
            trading_enabled: user.trading_enabled,
            completed_at: user.kyc_completed_at,
            phone_number: user.phone_number.as_deref().map(mask_phone),
        }
    }
}

/// Masks a phone number down to its last 4 digits.
///
/// Values of 4 characters or fewer pass through unmasked; there is nothing
/// left to hide once the visible suffix covers the whole value.
fn mask_phone(phone_number: &str) -> String {
    if phone_number.len() <= 4 {
        return phone_number.to_string();
    }
    let suffix: String = phone_number
        .chars()
        .skip(phone_number.chars().count().saturating_sub(4))
        .collect();
    format!("***{suffix}")
}

/// Read-only projection of a user's verification state
///
/// # Errors
///
/// - `404 user_not_found` - The user id is unknown
/// - `503 database_error` - Storage unavailable
pub async fn get_status(
    Extension(user_storage): Extension<Arc<UserStorage>>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let user = user_storage.get(&user_id).await?.ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "user_not_found",
            "User not found",
            false,
        )
    })?;

    Ok(Json(StatusResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_numbers_keep_only_the_last_four_digits() {
        assert_eq!(mask_phone("+15551234567"), "***4567");
        assert_eq!(mask_phone("15551234567"), "***4567");
        assert_eq!(mask_phone("55512"), "***5512");
    }

    #[test]
    fn short_numbers_pass_through_unmasked() {
        assert_eq!(mask_phone("4567"), "4567");
        assert_eq!(mask_phone("12"), "12");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn status_projection_masks_the_phone_number() {
        let mut user = User::new(
            "1f8373e1-6a17-4a28-a239-23a52e30f5f7".to_string(),
            None,
            Some("+15551234567".to_string()),
        );
        user.verification_retries = 1;

        let response = StatusResponse::from(user);
        assert_eq!(response.phone_number.as_deref(), Some("***4567"));
        assert_eq!(response.retries_remaining, 2);
        assert_eq!(response.kyc_status, KycStatus::Pending);
    }
}
