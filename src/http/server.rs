//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, server params, rate limit)
//! - Serve with peer address info until shutdown
//! - Sweep idle rate limit buckets while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handlers::{health_handler, identity_handler};
use crate::identity::params::populate_server_params;
use crate::security::{rate_limit_middleware, RateLimiterState};

/// HTTP server exposing identity-keyed rate limiting.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    limiter: Arc<RateLimiterState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));
        Self::with_limiter(config, limiter)
    }

    /// Create a server around an existing limiter, e.g. one with a custom resolver.
    pub fn with_limiter(config: ServiceConfig, limiter: Arc<RateLimiterState>) -> Self {
        let router = Self::build_router(&config, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, limiter: Arc<RateLimiterState>) -> Router {
        let limited = Router::new()
            .route("/", get(identity_handler))
            .route("/identity", get(identity_handler))
            .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        Router::new()
            .route("/health", get(health_handler))
            .merge(limited)
            .layer(middleware::from_fn(populate_server_params))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit_enabled = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        let cleanup = self.config.rate_limit.enabled.then(|| {
            self.limiter.spawn_cleanup_task(
                Duration::from_secs(self.config.rate_limit.cleanup_interval_secs),
                Duration::from_secs(self.config.rate_limit.idle_timeout_secs),
                shutdown.resubscribe(),
            )
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if let Some(cleanup) = cleanup {
            cleanup.abort();
        }
        served?;

        tracing::info!(
            tracked_identities = self.limiter.tracked_identities(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// The router, for serving or driving without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
