//! Webhook callback payload types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of callback the provider is delivering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WebhookType {
    /// The session's overall status changed
    #[serde(rename = "status.updated")]
    StatusUpdated,
    /// Extracted verification data changed without a status transition
    #[serde(rename = "data.updated")]
    DataUpdated,
    /// Forward-compatibility: unrecognized kinds are acked and ignored
    #[serde(other)]
    Unknown,
}

/// Provider-side verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderStatus {
    Approved,
    Declined,
    #[serde(rename = "In Review")]
    InReview,
    Abandoned,
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    /// Unrecognized statuses leave local state untouched
    #[serde(other)]
    Unknown,
}

impl ProviderStatus {
    /// Terminal statuses end the session; the correlation entry is dropped
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Declined | Self::Abandoned)
    }
}

/// One sub-verification outcome inside a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Outcome of this sub-verification
    pub status: ProviderStatus,
    /// Phone number, present on phone verification results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Everything else the provider sent, preserved for the details blob
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The provider's decision object.
///
/// Only the two sub-verifications the gateway reconciles are typed; the
/// rest of the blob is carried through `extra` so `kyc_details` stores the
/// decision wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_verification: Option<VerificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_verification: Option<VerificationResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed webhook callback
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Provider session id
    pub session_id: String,
    /// Provider-side session status
    pub status: ProviderStatus,
    /// Echo of the internal user id supplied at session creation
    pub vendor_data: String,
    /// Kind of callback
    pub webhook_type: WebhookType,
    /// Decision blob, present once sub-verifications have run
    #[serde(default)]
    pub decision: Option<Decision>,
    /// Free-form metadata echoed from session creation
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_status_updated_payload() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "session_id": "sess-1",
                "status": "Approved",
                "vendor_data": "user-1",
                "webhook_type": "status.updated",
                "decision": {
                    "id_verification": {"status": "Approved", "document_number": "X1"},
                    "phone_verification": {"status": "Approved", "phone_number": "+15551234567"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(payload.status, ProviderStatus::Approved);
        assert_eq!(payload.webhook_type, WebhookType::StatusUpdated);
        let decision = payload.decision.unwrap();
        assert_eq!(
            decision.id_verification.unwrap().extra["document_number"],
            "X1"
        );
        assert_eq!(
            decision.phone_verification.unwrap().phone_number.as_deref(),
            Some("+15551234567")
        );
    }

    #[test]
    fn unknown_statuses_and_types_parse_without_failing() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "session_id": "sess-1",
                "status": "Kyc Expired",
                "vendor_data": "user-1",
                "webhook_type": "session.expired"
            }"#,
        )
        .unwrap();

        assert_eq!(payload.status, ProviderStatus::Unknown);
        assert_eq!(payload.webhook_type, WebhookType::Unknown);
        assert!(!payload.status.is_terminal());
    }

    #[test]
    fn decision_blob_survives_a_serde_round_trip() {
        let raw = serde_json::json!({
            "id_verification": {"status": "Approved", "warnings": []},
            "face_match": {"score": 0.99},
            "session_number": 42
        });
        let decision: Decision = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&decision).unwrap(), raw);
    }

    #[test]
    fn terminal_statuses() {
        assert!(ProviderStatus::Approved.is_terminal());
        assert!(ProviderStatus::Declined.is_terminal());
        assert!(ProviderStatus::Abandoned.is_terminal());
        assert!(!ProviderStatus::InReview.is_terminal());
        assert!(!ProviderStatus::NotStarted.is_terminal());
    }
}
