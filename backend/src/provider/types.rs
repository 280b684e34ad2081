//! Wire types for the Didit verification API

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a session-creation call.
///
/// `vendor_data` is the only local identifier that ever crosses to the
/// provider; it is echoed back verbatim in webhook callbacks and is the
/// authoritative correlation key.
#[derive(Debug, Clone, Serialize)]
pub struct NewSessionRequest {
    /// Workflow the session runs under
    pub workflow_id: String,
    /// Opaque echo field carrying the internal user id
    pub vendor_data: String,
    /// URL the provider redirects to when the flow completes
    pub callback: String,
    /// Pre-filled contact details, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<Value>,
    /// Expected document holder details, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_details: Option<Value>,
    /// Free-form metadata, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Subset of the provider's session-creation response the gateway uses
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    /// Provider session id
    pub session_id: String,
    /// Short-lived token for embedding the verification flow
    #[serde(default)]
    pub session_token: Option<String>,
    /// Hosted verification URL the end user is sent to
    pub url: String,
    /// Provider-side session status
    pub status: String,
}

/// Normalized subset of a document-verification result
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentVerification {
    /// Provider verdict for the document
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_state: Option<String>,
    /// Provider warnings, passed through verbatim
    #[serde(default)]
    pub warnings: Vec<Value>,
}

impl DocumentVerification {
    /// Whether the provider reports the document as verified
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status.eq_ignore_ascii_case("approved") || self.status.eq_ignore_ascii_case("verified")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_request_omits_absent_optionals() {
        let request = NewSessionRequest {
            workflow_id: "wf-1".to_string(),
            vendor_data: "user-1".to_string(),
            callback: "https://api.example.com/callback".to_string(),
            contact_details: None,
            expected_details: None,
            metadata: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["workflow_id"], "wf-1");
        assert!(json.get("contact_details").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn document_approval_is_case_insensitive() {
        let mut result: DocumentVerification = serde_json::from_value(serde_json::json!({
            "status": "Approved",
            "document_type": "PASSPORT",
            "warnings": [],
        }))
        .unwrap();
        assert!(result.is_approved());

        result.status = "Declined".to_string();
        assert!(!result.is_approved());
    }
}
