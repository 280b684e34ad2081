//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::provider::ProviderError;
use kyc_storage::user::UserStorageError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
    /// Per-field validation failures, present on validation errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody {
                    code,
                    message: msg,
                    details: None,
                },
            },
        }
    }

    /// Create a validation error carrying the full list of field failures
    #[must_use]
    pub const fn validation(details: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            inner: ApiErrorResponse {
                allow_retry: false,
                error: ErrorBody {
                    code: "validation_error",
                    message: "Request validation failed",
                    details: Some(details),
                },
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert storage errors to application errors
impl From<UserStorageError> for AppError {
    fn from(err: UserStorageError) -> Self {
        use UserStorageError::{
            DynamoDbGetError, DynamoDbPutError, DynamoDbUpdateError, RetriesExhausted,
            SerializationError, UserNotFound,
        };

        match &err {
            UserNotFound => {
                tracing::debug!("User row not found");
                Self::new(StatusCode::NOT_FOUND, "user_not_found", "User not found", false)
            }
            RetriesExhausted => {
                tracing::warn!("Verification retry bound exhausted");
                Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "retries_exceeded",
                    "Maximum verification attempts reached",
                    false,
                )
            }
            DynamoDbPutError(_) | DynamoDbGetError(_) | DynamoDbUpdateError(_) => {
                tracing::error!("DynamoDB error: {err}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "database_error",
                    "Database service temporarily unavailable",
                    true,
                )
            }
            SerializationError(msg) => {
                tracing::error!("Serialization error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

/// Convert provider errors to application errors.
///
/// Upstream failures are logged with full detail and masked in the response.
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        use ProviderError::{Auth, BadRequest, NotFound, Permission, RateLimited, Unavailable};

        match &err {
            Auth => {
                tracing::error!("Provider rejected the API credentials");
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "upstream_auth",
                    "Verification provider rejected the API credentials",
                    false,
                )
            }
            Permission => {
                // Credential lacks scope; an operator problem, not a caller problem
                tracing::error!("Provider credentials lack the required scope");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
            BadRequest(detail) => {
                tracing::warn!("Provider rejected the request: {detail}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "upstream_rejected",
                    "Verification provider rejected the request",
                    false,
                )
            }
            RateLimited { retry_after } => {
                tracing::warn!("Provider rate limit hit, retry after {retry_after:?}s");
                Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limit_exceeded",
                    "Too many requests, please try again later",
                    true,
                )
            }
            NotFound => {
                tracing::debug!("Resource not found at provider");
                Self::new(StatusCode::NOT_FOUND, "not_found", "Resource not found", false)
            }
            Unavailable(detail) => {
                tracing::error!("Provider unavailable: {detail}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "upstream_unavailable",
                    "Verification provider temporarily unavailable",
                    true,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
