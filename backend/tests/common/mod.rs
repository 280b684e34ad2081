// Not every helper is used in every test file
#![allow(dead_code)]

use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use axum::{body::Body, response::Response, Router};
use http_body_util::BodyExt;
use serde_json::Value;

use backend::{provider::mock::MockVerificationApi, server, types::Environment};
use kyc_storage::user::UserStorage;

/// Secret the test router verifies webhook signatures against
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load any local overrides first
    dotenvy::dotenv().ok();

    std::env::set_var("APP_ENV", "development");
    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
    std::env::set_var("AWS_REGION", "us-east-1");
    std::env::set_var("DIDIT_WEBHOOK_SECRET", TEST_WEBHOOK_SECRET);

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Builds the full application router with a mock provider and no
/// correlation cache. Storage points at the development LocalStack
/// endpoint; tests that assert on pre-storage behavior (signatures, rate
/// limits, validation) never reach it.
pub async fn test_router() -> Router {
    test_router_with_provider(MockVerificationApi::default()).await
}

/// Same as [`test_router`] but with canned provider responses
pub async fn test_router_with_provider(provider: MockVerificationApi) -> Router {
    setup_test_env();

    let environment = Environment::from_env();
    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let user_storage = Arc::new(UserStorage::new(
        dynamodb_client,
        environment.users_table_name(),
    ));

    server::build_router(environment, user_storage, None, Arc::new(provider))
}

/// Collects a response body into JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
