//! Webhook status reconciliation
//!
//! Turns a verified provider callback into a [`KycUpdate`] for the user
//! row. Updates are full overwrites keyed by the `vendor_data` user id, so
//! redelivered callbacks re-apply cleanly without double-counting.

pub mod signature;
pub mod types;

use kyc_storage::user::{KycStatus, KycUpdate};

pub use signature::{sign, verify_signature};
pub use types::{Decision, ProviderStatus, VerificationResult, WebhookPayload, WebhookType};

/// Vendor name written to `kyc_provider` on every status update
pub const PROVIDER_NAME: &str = "didit";

/// Maps a provider session status onto the local KYC status.
///
/// Anything outside the three mapped statuses leaves the local status
/// untouched.
#[must_use]
pub const fn kyc_status_for(status: ProviderStatus) -> Option<KycStatus> {
    match status {
        ProviderStatus::Approved => Some(KycStatus::Verified),
        ProviderStatus::Declined => Some(KycStatus::Failed),
        ProviderStatus::InReview => Some(KycStatus::Pending),
        _ => None,
    }
}

/// Builds the user-row overwrite for a parsed callback.
///
/// Returns `None` when the callback carries nothing to persist (unknown
/// webhook type, or a `data.updated` without a decision).
#[must_use]
pub fn build_kyc_update(payload: &WebhookPayload, now: i64) -> Option<KycUpdate> {
    let decision_json = payload
        .decision
        .as_ref()
        .map(|decision| serde_json::to_string(decision).expect("decision came from JSON"));

    match payload.webhook_type {
        WebhookType::StatusUpdated => {
            let kyc_status = kyc_status_for(payload.status);
            let decision = payload.decision.as_ref();

            Some(KycUpdate {
                kyc_status,
                kyc_provider: Some(PROVIDER_NAME.to_string()),
                kyc_completed_at: (kyc_status == Some(KycStatus::Verified)).then_some(now),
                kyc_details: decision_json,
                id_verified: decision
                    .and_then(|d| d.id_verification.as_ref())
                    .map(|result| result.status == ProviderStatus::Approved),
                phone_verified: decision
                    .and_then(|d| d.phone_verification.as_ref())
                    .map(|result| result.status == ProviderStatus::Approved),
                phone_number: decision
                    .and_then(|d| d.phone_verification.as_ref())
                    .and_then(|result| result.phone_number.clone()),
            })
        }
        WebhookType::DataUpdated => decision_json.map(|details| KycUpdate {
            kyc_details: Some(details),
            ..KycUpdate::default()
        }),
        WebhookType::Unknown => None,
    }
}

/// Whether the callback should flip the user's trading flag.
///
/// Only a final approval that actually carries a decision enables trading;
/// the flag is monotonic, so re-deliveries just re-set it to true.
#[must_use]
pub const fn enables_trading(payload: &WebhookPayload) -> bool {
    matches!(payload.webhook_type, WebhookType::StatusUpdated)
        && matches!(payload.status, ProviderStatus::Approved)
        && payload.decision.is_some()
}
