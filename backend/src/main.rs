use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;

use backend::{
    cache::CorrelationCache,
    provider::{DiditClient, VerificationApi},
    server,
    types::Environment,
};
use kyc_storage::user::UserStorage;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production, regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let user_storage = Arc::new(UserStorage::new(
        dynamodb_client,
        environment.users_table_name(),
    ));

    tracing::info!("✅ Initialized user storage");

    // The correlation cache is an optimization; start degraded when Redis
    // is unreachable rather than refusing to serve
    let correlation_cache = match CorrelationCache::connect(&environment.redis_url()).await {
        Ok(cache) => {
            tracing::info!("✅ Initialized correlation cache");
            Some(Arc::new(cache))
        }
        Err(e) => {
            tracing::warn!("Correlation cache unavailable, continuing without it: {e}");
            None
        }
    };

    let provider: Arc<dyn VerificationApi> = Arc::new(DiditClient::new(
        environment.didit_base_url(),
        environment.didit_api_key(),
        environment.didit_workflow_id(),
        environment.callback_base_url(),
    ));

    tracing::info!("✅ Initialized verification provider client");

    server::start(environment, user_storage, correlation_cache, provider).await
}
