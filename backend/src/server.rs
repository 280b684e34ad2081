use std::net::SocketAddr;
use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::cache::CorrelationCache;
use crate::provider::VerificationApi;
use crate::routes;
use crate::types::Environment;
use kyc_storage::user::UserStorage;

/// Document verification uploads base64 images; the axum default of 2 MB is
/// too small for two photos
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Outbound document verification is allowed 30s, so the inbound budget
/// must sit above it
const REQUEST_TIMEOUT_SECS: u64 = 35;

/// Assembles the full application router with its dependency extensions.
///
/// Dependencies are constructed once at startup and injected explicitly;
/// the correlation cache is optional and the service runs degraded without
/// it.
pub fn build_router(
    environment: Environment,
    user_storage: Arc<UserStorage>,
    correlation_cache: Option<Arc<CorrelationCache>>,
    provider: Arc<dyn VerificationApi>,
) -> Router {
    let mut openapi = OpenApi::default();
    let cors = cors_layer(&environment);

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(user_storage))
        .layer(Extension(correlation_cache))
        .layer(Extension(provider))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    user_storage: Arc<UserStorage>,
    correlation_cache: Option<Arc<CorrelationCache>>,
    provider: Arc<dyn VerificationApi>,
) -> anyhow::Result<()> {
    let router = build_router(environment, user_storage, correlation_cache, provider);

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8080), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 KYC Verification Gateway started on http://{addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(anyhow::Error::from)
}

/// CORS is pinned to the configured frontend origin outside development
fn cors_layer(environment: &Environment) -> CorsLayer {
    environment.frontend_origin().map_or_else(CorsLayer::permissive, |origin| {
        CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("FRONTEND_ORIGIN must be a valid header value"),
            )
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    })
}

/// Resolves when the process receives SIGINT or SIGTERM; connections are
/// drained and the storage/cache clients drop with the process
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
