//! Rate limiting middleware keyed by caller identity.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::identity::{IdentityResolver, IdentitySource, IpAddressIdentityResolver};
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_update)
    }
}

/// Identity of the caller, attached to the request for handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: String,
    pub source: IdentitySource,
}

/// State for the identity-keyed rate limiter.
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    resolver: Arc<dyn IdentityResolver>,
    enabled: bool,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    /// Create a limiter using [`IpAddressIdentityResolver`].
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_resolver(config, Arc::new(IpAddressIdentityResolver::new()))
    }

    /// Create a limiter with a custom identity resolver.
    pub fn with_resolver(config: &RateLimitConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            buckets: DashMap::new(),
            resolver,
            enabled: config.enabled,
            rps: config.requests_per_second as f64,
            burst: config.burst_size as f64,
        }
    }

    /// Take one token from the bucket of `identity`.
    pub fn check(&self, identity: &str) -> bool {
        if !self.enabled {
            return true;
        }

        if let Some(mut bucket) = self.buckets.get_mut(identity) {
            return bucket.try_acquire(self.burst, self.rps);
        }

        self.buckets
            .entry(identity.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst))
            .try_acquire(self.burst, self.rps)
    }

    /// Number of identities with a bucket.
    pub fn tracked_identities(&self) -> usize {
        self.buckets.len()
    }

    /// Drop buckets untouched for at least `idle`. Returns how many were removed.
    pub fn cleanup(&self, idle: Duration) -> usize {
        let before = self.buckets.len();
        let now = Instant::now();
        self.buckets.retain(|_, bucket| bucket.idle_for(now) < idle);
        before.saturating_sub(self.buckets.len())
    }

    /// Run [`cleanup`](Self::cleanup) every `every` until shutdown.
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        every: Duration,
        idle: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = state.cleanup(idle);
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                remaining = state.tracked_identities(),
                                "Evicted idle rate limit buckets"
                            );
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Rate limit cleanup stopped");
        })
    }

    fn resolve(&self, request: &Request<Body>) -> ResolvedIdentity {
        let (identity, source) = self.resolver.identity_with_source(request);
        ResolvedIdentity { identity, source }
    }
}

/// Middleware function for identity-keyed rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = state.resolve(&request);
    metrics::record_identity(resolved.source);
    tracing::debug!(
        identity = %resolved.identity,
        source = %resolved.source,
        "Resolved caller identity"
    );

    if state.check(&resolved.identity) {
        request.extensions_mut().insert(resolved);
        next.run(request).await
    } else {
        tracing::warn!(
            identity = %resolved.identity,
            source = %resolved.source,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(resolved.source);
        let mut response = Response::new(Body::from("Rate limit exceeded"));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}
