//! Client for the Didit identity-verification API
//!
//! Translates local verification concepts into the provider's wire calls
//! and normalizes its failures. The only local identifier that crosses the
//! boundary is the user id carried in `vendor_data`.

pub mod error;
pub mod types;

use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde_json::Value;

pub use error::{ProviderError, ProviderResult};
pub use types::{DocumentVerification, NewSessionRequest, SessionCreated};

/// Timeout for session, phone and retrieval calls
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Document verification uploads images and is allowed to run longer
const DOCUMENT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Trait for the verification provider API
#[async_trait::async_trait]
pub trait VerificationApi: Send + Sync {
    /// Creates a verification session for a user. Terminal-status and
    /// retry-bound pre-checks are the caller's responsibility.
    async fn create_session(
        &self,
        vendor_data: &str,
        contact_details: Option<Value>,
        expected_details: Option<Value>,
        metadata: Option<Value>,
    ) -> ProviderResult<SessionCreated>;

    /// Retrieves the provider's session object verbatim
    async fn retrieve_session(&self, session_id: &str) -> ProviderResult<Value>;

    /// Sends a one-time code to a phone number
    async fn send_phone_code(&self, phone_number: &str) -> ProviderResult<Value>;

    /// Checks a one-time code; returns the provider's validity object verbatim
    async fn check_phone_code(&self, phone_number: &str, code: &str) -> ProviderResult<Value>;

    /// Verifies an identity document from base64-encoded images
    async fn verify_document(
        &self,
        front_image: &str,
        back_image: Option<&str>,
        document_type: Option<&str>,
    ) -> ProviderResult<DocumentVerification>;
}

/// HTTP client for the Didit verification API
pub struct DiditClient {
    base_url: String,
    api_key: String,
    workflow_id: String,
    callback_url: String,
    http_client: Client,
}

impl DiditClient {
    /// Creates a new Didit API client
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new(
        base_url: String,
        api_key: String,
        workflow_id: String,
        callback_url: String,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            workflow_id,
            callback_url,
            http_client,
        }
    }

    async fn handle<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

/// Maps a non-2xx provider response onto a [`ProviderError`]
async fn error_for_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok());
    let detail = response.text().await.unwrap_or_default();

    map_status(status, retry_after, detail)
}

fn map_status(status: StatusCode, retry_after: Option<u64>, detail: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Auth,
        StatusCode::FORBIDDEN => ProviderError::Permission,
        StatusCode::BAD_REQUEST => ProviderError::BadRequest(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        _ => ProviderError::Unavailable(format!("Status {status}: {detail}")),
    }
}

#[async_trait::async_trait]
impl VerificationApi for DiditClient {
    async fn create_session(
        &self,
        vendor_data: &str,
        contact_details: Option<Value>,
        expected_details: Option<Value>,
        metadata: Option<Value>,
    ) -> ProviderResult<SessionCreated> {
        let request = NewSessionRequest {
            workflow_id: self.workflow_id.clone(),
            vendor_data: vendor_data.to_string(),
            callback: self.callback_url.clone(),
            contact_details,
            expected_details,
            metadata,
        };

        let response = self
            .http_client
            .post(format!("{}/v2/session/", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        Self::handle(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> ProviderResult<Value> {
        let response = self
            .http_client
            .get(format!("{}/v2/session/{session_id}/", self.base_url))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        Self::handle(response).await
    }

    async fn send_phone_code(&self, phone_number: &str) -> ProviderResult<Value> {
        let response = self
            .http_client
            .post(format!("{}/v2/phone/send-code/", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "phone_number": phone_number }))
            .send()
            .await?;

        Self::handle(response).await
    }

    async fn check_phone_code(&self, phone_number: &str, code: &str) -> ProviderResult<Value> {
        let response = self
            .http_client
            .post(format!("{}/v2/phone/check-code/", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({
                "phone_number": phone_number,
                "code": code,
            }))
            .send()
            .await?;

        Self::handle(response).await
    }

    async fn verify_document(
        &self,
        front_image: &str,
        back_image: Option<&str>,
        document_type: Option<&str>,
    ) -> ProviderResult<DocumentVerification> {
        let mut body = serde_json::json!({ "front_image": front_image });
        if let Some(back_image) = back_image {
            body["back_image"] = Value::String(back_image.to_string());
        }
        if let Some(document_type) = document_type {
            body["document_type"] = Value::String(document_type.to_string());
        }

        let response = self
            .http_client
            .post(format!("{}/v2/id-verification/", self.base_url))
            .header("x-api-key", &self.api_key)
            // Image uploads get a longer budget than the light calls
            .timeout(Duration::from_secs(DOCUMENT_REQUEST_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await?;

        Self::handle(response).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Canned provider responses for router-level tests

    use super::{DocumentVerification, ProviderResult, SessionCreated, VerificationApi};
    use serde_json::{json, Value};

    /// Mock provider returning overridable canned responses
    #[derive(Default)]
    pub struct MockVerificationApi {
        pub session: Option<SessionCreated>,
        pub session_object: Option<Value>,
        pub phone_send_response: Option<Value>,
        pub phone_check_response: Option<Value>,
        pub document: Option<DocumentVerification>,
    }

    #[async_trait::async_trait]
    impl VerificationApi for MockVerificationApi {
        async fn create_session(
            &self,
            vendor_data: &str,
            _contact_details: Option<Value>,
            _expected_details: Option<Value>,
            _metadata: Option<Value>,
        ) -> ProviderResult<SessionCreated> {
            Ok(self.session.clone().unwrap_or_else(|| SessionCreated {
                session_id: format!("mock-session-{vendor_data}"),
                session_token: Some("mock-session-token".to_string()),
                url: "https://verify.example.com/mock".to_string(),
                status: "Not Started".to_string(),
            }))
        }

        async fn retrieve_session(&self, session_id: &str) -> ProviderResult<Value> {
            Ok(self
                .session_object
                .clone()
                .unwrap_or_else(|| json!({ "session_id": session_id, "status": "Not Started" })))
        }

        async fn send_phone_code(&self, phone_number: &str) -> ProviderResult<Value> {
            Ok(self.phone_send_response.clone().unwrap_or_else(|| {
                json!({
                    "request_id": "mock-request-id",
                    "phone_number": phone_number,
                    "message": "Code sent",
                })
            }))
        }

        async fn check_phone_code(&self, phone_number: &str, _code: &str) -> ProviderResult<Value> {
            Ok(self.phone_check_response.clone().unwrap_or_else(|| {
                json!({
                    "phone_number": phone_number,
                    "status": "Approved",
                })
            }))
        }

        async fn verify_document(
            &self,
            _front_image: &str,
            _back_image: Option<&str>,
            _document_type: Option<&str>,
        ) -> ProviderResult<DocumentVerification> {
            Ok(self.document.clone().unwrap_or_else(|| {
                serde_json::from_value(json!({
                    "status": "Approved",
                    "document_type": "PASSPORT",
                    "document_number": "X1234567",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "warnings": [],
                }))
                .expect("static mock document is valid")
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_success_statuses_map_onto_the_local_taxonomy() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, None, String::new()),
            ProviderError::Auth
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, None, String::new()),
            ProviderError::Permission
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, None, String::new()),
            ProviderError::BadRequest(_)
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, None, String::new()),
            ProviderError::NotFound
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, None, String::new()),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, None, String::new()),
            ProviderError::Unavailable(_)
        ));
    }

    #[test]
    fn rate_limit_carries_the_retry_hint() {
        let err = map_status(StatusCode::TOO_MANY_REQUESTS, Some(30), String::new());
        match err {
            ProviderError::RateLimited { retry_after } => assert_eq!(retry_after, Some(30)),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
