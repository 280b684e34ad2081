//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack` and local Redis)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Returns the users table name
    ///
    /// # Panics
    ///
    /// Panics if the `DYNAMODB_USERS_TABLE_NAME` environment variable is not
    /// set in production/staging
    #[must_use]
    pub fn users_table_name(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("DYNAMODB_USERS_TABLE_NAME")
                .expect("DYNAMODB_USERS_TABLE_NAME environment variable is not set"),
            Self::Development => {
                env::var("DYNAMODB_USERS_TABLE_NAME").unwrap_or_else(|_| "kyc-users".to_string())
            }
        }
    }

    /// Returns the Redis URL for the correlation cache
    ///
    /// # Panics
    ///
    /// Panics if the `REDIS_URL` environment variable is not set in
    /// production/staging
    #[must_use]
    pub fn redis_url(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("REDIS_URL").expect("REDIS_URL environment variable is not set")
            }
            Self::Development => {
                env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
            }
        }
    }

    /// Returns the Didit API key
    ///
    /// # Panics
    ///
    /// Panics if the `DIDIT_API_KEY` environment variable is not set in
    /// production/staging
    #[must_use]
    pub fn didit_api_key(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("DIDIT_API_KEY").expect("DIDIT_API_KEY environment variable is not set")
            }
            Self::Development => {
                env::var("DIDIT_API_KEY").unwrap_or_else(|_| "test-api-key".to_string())
            }
        }
    }

    /// Returns the Didit workflow id sessions are created against
    ///
    /// # Panics
    ///
    /// Panics if the `DIDIT_WORKFLOW_ID` environment variable is not set in
    /// production/staging
    #[must_use]
    pub fn didit_workflow_id(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("DIDIT_WORKFLOW_ID")
                .expect("DIDIT_WORKFLOW_ID environment variable is not set"),
            Self::Development => {
                env::var("DIDIT_WORKFLOW_ID").unwrap_or_else(|_| "test-workflow".to_string())
            }
        }
    }

    /// Returns the Didit API base URL
    #[must_use]
    pub fn didit_base_url(&self) -> String {
        env::var("DIDIT_BASE_URL").unwrap_or_else(|_| "https://verification.didit.me".to_string())
    }

    /// Returns the shared webhook signing secret, if configured.
    ///
    /// Webhooks are rejected outright when no secret is present; the
    /// receiver never falls back to accepting unauthenticated payloads.
    #[must_use]
    pub fn webhook_secret(&self) -> Option<String> {
        env::var("DIDIT_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
    }

    /// Returns the base URL the provider calls back into
    ///
    /// # Panics
    ///
    /// Panics if the `CALLBACK_BASE_URL` environment variable is not set in
    /// production/staging
    #[must_use]
    pub fn callback_base_url(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("CALLBACK_BASE_URL")
                .expect("CALLBACK_BASE_URL environment variable is not set"),
            Self::Development => env::var("CALLBACK_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        }
    }

    /// Returns the frontend origin allowed by CORS, if any
    #[must_use]
    pub fn frontend_origin(&self) -> Option<String> {
        env::var("FRONTEND_ORIGIN").ok().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test explicit development
        env::set_var("APP_ENV", "development");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test staging
        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);

        // Test production
        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_webhook_secret_empty_is_absent() {
        env::set_var("DIDIT_WEBHOOK_SECRET", "");
        assert_eq!(Environment::Development.webhook_secret(), None);

        env::set_var("DIDIT_WEBHOOK_SECRET", "whsec_123");
        assert_eq!(
            Environment::Development.webhook_secret(),
            Some("whsec_123".to_string())
        );

        env::remove_var("DIDIT_WEBHOOK_SECRET");
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        env::remove_var("DYNAMODB_USERS_TABLE_NAME");
        env::remove_var("REDIS_URL");
        env::remove_var("DIDIT_BASE_URL");

        let env = Environment::Development;
        assert_eq!(env.users_table_name(), "kyc-users");
        assert_eq!(env.redis_url(), "redis://localhost:6379");
        assert_eq!(env.didit_base_url(), "https://verification.didit.me");
        assert!(env.show_api_docs());
        assert!(!Environment::Production.show_api_docs());
    }
}
