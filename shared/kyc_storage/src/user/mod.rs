//! User verification state storage integration using Dynamo DB
//!
//! One item per end user, keyed by the externally supplied user id. The
//! webhook receiver and the session handlers reconcile verification outcomes
//! into this record; every update is a full overwrite of the touched
//! attributes, which keeps redelivered webhooks idempotent.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client as DynamoDbClient};
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use error::{UserStorageError, UserStorageResult};
use strum::Display;

/// Attribute names for the users table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserAttribute {
    /// User id (Primary Key), externally supplied UUID
    UserId,
    /// Email address, filled in from contact details when first seen
    Email,
    /// Local KYC status
    KycStatus,
    /// Name of the verification vendor once one is used
    KycProvider,
    /// Set when the status transitions to VERIFIED
    KycCompletedAt,
    /// Opaque JSON blob of the last provider decision
    KycDetails,
    /// Set true only after a successful terminal verification
    TradingEnabled,
    /// Session-creation attempt counter
    VerificationRetries,
    /// Timestamp of the most recent session-creation call
    LastVerificationAttempt,
    /// Document verification outcome
    IdVerified,
    /// Phone verification outcome
    PhoneVerified,
    /// Overwritten when phone verification succeeds
    PhoneNumber,
    /// Unrelated to the KYC flow (separate feature)
    EmailVerified,
    /// Creation timestamp
    CreatedAt,
    /// Last update timestamp
    UpdatedAt,
}

/// Local KYC status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// Verification not yet completed (default)
    Pending,
    /// Terminal: the provider approved the user
    Verified,
    /// The provider declined the user
    Failed,
}

/// User verification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User id (Primary Key)
    pub user_id: String,
    /// Email address
    pub email: Option<String>,
    /// Local KYC status
    pub kyc_status: KycStatus,
    /// Verification vendor name
    pub kyc_provider: Option<String>,
    /// Epoch seconds of the VERIFIED transition
    pub kyc_completed_at: Option<i64>,
    /// JSON blob of the last provider decision, overwritten on each update
    pub kyc_details: Option<String>,
    /// Monotonic trading flag
    pub trading_enabled: bool,
    /// Session-creation attempts so far
    pub verification_retries: u32,
    /// Epoch seconds of the last session-creation call
    pub last_verification_attempt: Option<i64>,
    /// Document verification outcome
    pub id_verified: bool,
    /// Phone verification outcome
    pub phone_verified: bool,
    /// Verified phone number
    pub phone_number: Option<String>,
    /// Email verification flag (separate feature)
    pub email_verified: bool,
    /// Creation timestamp, epoch seconds
    pub created_at: i64,
    /// Last update timestamp, epoch seconds
    pub updated_at: i64,
}

impl User {
    /// Creates a fresh record for a user that has never attempted verification
    #[must_use]
    pub fn new(user_id: String, email: Option<String>, phone_number: Option<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            user_id,
            email,
            kyc_status: KycStatus::Pending,
            kyc_provider: None,
            kyc_completed_at: None,
            kyc_details: None,
            trading_enabled: false,
            verification_retries: 0,
            last_verification_attempt: None,
            id_verified: false,
            phone_verified: false,
            phone_number,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request payload for lazily creating a user row
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User id (Primary Key)
    pub user_id: String,
    /// Email address, if known
    pub email: Option<String>,
    /// Phone number, if known
    pub phone_number: Option<String>,
}

/// A partial overwrite of the verification fields of a user row.
///
/// Only `Some` fields are written; `updated_at` is always stamped. Applying
/// the same update twice leaves the row in the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KycUpdate {
    /// New local KYC status
    pub kyc_status: Option<KycStatus>,
    /// Verification vendor name
    pub kyc_provider: Option<String>,
    /// Epoch seconds of the VERIFIED transition
    pub kyc_completed_at: Option<i64>,
    /// JSON blob of the provider decision
    pub kyc_details: Option<String>,
    /// Document verification outcome
    pub id_verified: Option<bool>,
    /// Phone verification outcome
    pub phone_verified: Option<bool>,
    /// Verified phone number
    pub phone_number: Option<String>,
}

impl KycUpdate {
    /// Whether the update would write anything beyond `updated_at`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builds the `UpdateExpression` and its placeholder maps for a [`KycUpdate`].
fn update_expression_for(
    update: &KycUpdate,
    now: i64,
) -> (String, Vec<(String, String)>, Vec<(String, AttributeValue)>) {
    let mut sets: Vec<(String, AttributeValue)> = vec![(
        UserAttribute::UpdatedAt.to_string(),
        AttributeValue::N(now.to_string()),
    )];

    if let Some(status) = update.kyc_status {
        sets.push((
            UserAttribute::KycStatus.to_string(),
            AttributeValue::S(status.to_string()),
        ));
    }
    if let Some(provider) = &update.kyc_provider {
        sets.push((
            UserAttribute::KycProvider.to_string(),
            AttributeValue::S(provider.clone()),
        ));
    }
    if let Some(completed_at) = update.kyc_completed_at {
        sets.push((
            UserAttribute::KycCompletedAt.to_string(),
            AttributeValue::N(completed_at.to_string()),
        ));
    }
    if let Some(details) = &update.kyc_details {
        sets.push((
            UserAttribute::KycDetails.to_string(),
            AttributeValue::S(details.clone()),
        ));
    }
    if let Some(id_verified) = update.id_verified {
        sets.push((
            UserAttribute::IdVerified.to_string(),
            AttributeValue::Bool(id_verified),
        ));
    }
    if let Some(phone_verified) = update.phone_verified {
        sets.push((
            UserAttribute::PhoneVerified.to_string(),
            AttributeValue::Bool(phone_verified),
        ));
    }
    if let Some(phone_number) = &update.phone_number {
        sets.push((
            UserAttribute::PhoneNumber.to_string(),
            AttributeValue::S(phone_number.clone()),
        ));
    }

    let expression = format!(
        "SET {}",
        sets.iter()
            .map(|(attr, _)| format!("#{attr} = :{attr}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let names = sets
        .iter()
        .map(|(attr, _)| (format!("#{attr}"), attr.clone()))
        .collect();
    let values = sets
        .into_iter()
        .map(|(attr, value)| (format!(":{attr}"), value))
        .collect();

    (expression, names, values)
}

/// User storage client for Dynamo DB operations
pub struct UserStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl UserStorage {
    /// Creates a new user storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for user records
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    /// Gets a user by id
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError` if the Dynamo DB operation fails
    pub async fn get(&self, user_id: &str) -> UserStorageResult<Option<User>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                UserAttribute::UserId.to_string(),
                AttributeValue::S(user_id.to_string()),
            )
            .send()
            .await?;

        let item = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| UserStorageError::SerializationError(e.to_string()))?;

        Ok(item)
    }

    /// Gets the user row, lazily creating it when absent.
    ///
    /// Creation is conditional on the key not existing, so two concurrent
    /// first requests for the same user id converge on a single row.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError` if the Dynamo DB operation fails
    pub async fn get_or_create(&self, request: NewUser) -> UserStorageResult<User> {
        if let Some(user) = self.get(&request.user_id).await? {
            return Ok(user);
        }

        let user = User::new(request.user_id, request.email, request.phone_number);
        let item = serde_dynamo::to_item(&user)
            .map_err(|e| UserStorageError::SerializationError(e.to_string()))?;

        let result = self
            .dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", UserAttribute::UserId.to_string())
            .send()
            .await;

        match result {
            Ok(_) => Ok(user),
            Err(err)
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) =>
            {
                // Lost the creation race; the winner's row is authoritative
                self.get(&user.user_id)
                    .await?
                    .ok_or(UserStorageError::UserNotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Atomically consumes one verification attempt for the user.
    ///
    /// The increment is conditional on the counter being below
    /// `max_attempts`, which closes the check-then-increment race between
    /// concurrent session-creation requests: the bound is enforced by the
    /// store, not by a read-modify-write in the handler.
    ///
    /// Returns the new attempt count.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError::RetriesExhausted` when the bound is
    /// already reached, or another `UserStorageError` if the Dynamo DB
    /// operation fails
    pub async fn record_verification_attempt(
        &self,
        user_id: &str,
        max_attempts: u32,
    ) -> UserStorageResult<u32> {
        let now = Utc::now().timestamp();

        let result = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                UserAttribute::UserId.to_string(),
                AttributeValue::S(user_id.to_string()),
            )
            .update_expression(
                "SET #retries = #retries + :one, #last_attempt = :now, #updated_at = :now",
            )
            .condition_expression("attribute_exists(#pk) AND #retries < :max")
            .expression_attribute_names("#pk", UserAttribute::UserId.to_string())
            .expression_attribute_names("#retries", UserAttribute::VerificationRetries.to_string())
            .expression_attribute_names(
                "#last_attempt",
                UserAttribute::LastVerificationAttempt.to_string(),
            )
            .expression_attribute_names("#updated_at", UserAttribute::UpdatedAt.to_string())
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .expression_attribute_values(":max", AttributeValue::N(max_attempts.to_string()))
            .return_values(aws_sdk_dynamodb::types::ReturnValue::UpdatedNew)
            .send()
            .await;

        let response = result.map_err(|err| {
            if matches!(
                err,
                SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
            ) {
                UserStorageError::RetriesExhausted
            } else {
                err.into()
            }
        })?;

        response
            .attributes()
            .and_then(|attrs| attrs.get(&UserAttribute::VerificationRetries.to_string()))
            .and_then(|value| value.as_n().ok())
            .and_then(|count| count.parse::<u32>().ok())
            .ok_or_else(|| {
                UserStorageError::SerializationError(
                    "UpdateItem did not return the new retry count".to_string(),
                )
            })
    }

    /// Applies a partial overwrite of the verification fields.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError::UserNotFound` when no row exists for the
    /// user id, or another `UserStorageError` if the Dynamo DB operation
    /// fails
    pub async fn apply_kyc_update(
        &self,
        user_id: &str,
        update: &KycUpdate,
    ) -> UserStorageResult<()> {
        let now = Utc::now().timestamp();
        let (expression, names, values) = update_expression_for(update, now);

        let mut builder = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                UserAttribute::UserId.to_string(),
                AttributeValue::S(user_id.to_string()),
            )
            .update_expression(expression)
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", UserAttribute::UserId.to_string());

        for (placeholder, attr) in names {
            builder = builder.expression_attribute_names(placeholder, attr);
        }
        for (placeholder, value) in values {
            builder = builder.expression_attribute_values(placeholder, value);
        }

        builder.send().await.map_err(|err| {
            if matches!(
                err,
                SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
            ) {
                UserStorageError::UserNotFound
            } else {
                err.into()
            }
        })?;

        Ok(())
    }

    /// Sets the monotonic `trading_enabled` flag for a user.
    ///
    /// The flag is only ever set true by this flow; there is no reset path.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError::UserNotFound` when no row exists for the
    /// user id, or another `UserStorageError` if the Dynamo DB operation
    /// fails
    pub async fn set_trading_enabled(&self, user_id: &str) -> UserStorageResult<()> {
        let now = Utc::now().timestamp();

        self.dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                UserAttribute::UserId.to_string(),
                AttributeValue::S(user_id.to_string()),
            )
            .update_expression("SET #trading_enabled = :enabled, #updated_at = :now")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", UserAttribute::UserId.to_string())
            .expression_attribute_names(
                "#trading_enabled",
                UserAttribute::TradingEnabled.to_string(),
            )
            .expression_attribute_names("#updated_at", UserAttribute::UpdatedAt.to_string())
            .expression_attribute_values(":enabled", AttributeValue::Bool(true))
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    UserStorageError::UserNotFound
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }
}
