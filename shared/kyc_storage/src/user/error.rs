//! Error types for user storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    get_item::GetItemError, put_item::PutItemError, update_item::UpdateItemError,
};
use thiserror::Error;

/// Result type for user storage operations
pub type UserStorageResult<T> = Result<T, UserStorageError>;

/// Errors that can occur during user storage operations
#[derive(Error, Debug)]
pub enum UserStorageError {
    /// Failed to insert user into Dynamo DB
    #[error("Failed to insert user into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to get user from Dynamo DB
    #[error("Failed to get user from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to update user in Dynamo DB
    #[error("Failed to update user in DynamoDB: {0}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// The user row does not exist
    #[error("User not found")]
    UserNotFound,

    /// The verification retry bound is exhausted for this user
    #[error("Verification retry bound exhausted")]
    RetriesExhausted,

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
