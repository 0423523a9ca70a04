//! Per-client request rate limiting.
//!
//! Counts requests per client IP in a fixed window that restarts once it has
//! elapsed. The client is the socket peer; forwarded headers are honored only
//! when the peer is a configured trusted proxy. Counters live in process memory: they reset on restart and are
//! not shared between instances. `RateLimitStore` is the seam for a shared
//! backend.

use std::collections::HashMap;
use std::future::{Ready, ready};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, ResponseError};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::error::AppError;

/// Map size above which entries are pruned before a new client is added.
const PRUNE_THRESHOLD: usize = 10_000;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { limit: u32, remaining: u32 },
    Limited { retry_after: Duration },
}

/// Request counter keyed by client.
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` at `now` and decide whether it may proceed.
    fn hit(&self, key: &str, now: Instant) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// In-process store: one counter and window start per key.
pub struct InMemoryRateLimitStore {
    max_requests: u32,
    window: Duration,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl InMemoryRateLimitStore {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn hit(&self, key: &str, now: Instant) -> RateLimitDecision {
        // Counters stay consistent even if a previous holder panicked
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if entries.len() >= PRUNE_THRESHOLD && !entries.contains_key(key) {
            prune(&mut entries, now, self.window);
        }

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        let elapsed = now.saturating_duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count > self.max_requests {
            let elapsed = now.saturating_duration_since(entry.window_start);
            RateLimitDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            RateLimitDecision::Allowed {
                limit: self.max_requests,
                remaining: self.max_requests - entry.count,
            }
        }
    }
}

/// Drop expired windows. If the map is still full, drop the older half of
/// the live windows so the next prune is at least `PRUNE_THRESHOLD / 2`
/// inserts away.
fn prune(entries: &mut HashMap<String, WindowEntry>, now: Instant, window: Duration) {
    entries.retain(|_, e| now.saturating_duration_since(e.window_start) < window);
    if entries.len() < PRUNE_THRESHOLD {
        return;
    }

    let mut starts: Vec<Instant> = entries.values().map(|e| e.window_start).collect();
    let middle = starts.len() / 2;
    let (_, cutoff, _) = starts.select_nth_unstable(middle);
    let cutoff = *cutoff;
    entries.retain(|_, e| e.window_start > cutoff);
    warn!(
        tracked_clients = entries.len(),
        "Rate limit store full of live windows, evicted oldest clients"
    );
}

/// Whole seconds a client should wait, at least one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Rate limit key for a request.
///
/// The peer IP, unless the peer is a trusted proxy, in which case the
/// forwarded client address is used.
fn client_key(req: &ServiceRequest, trusted_proxies: &[IpAddr]) -> String {
    match req.peer_addr().map(|addr| addr.ip()) {
        Some(ip) if trusted_proxies.contains(&ip) => req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string)
            .unwrap_or_else(|| ip.to_string()),
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}

/// Rate limiting middleware factory.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            trusted_proxies: Arc::from(Vec::new()),
        }
    }

    /// Honor forwarded client addresses from these peers.
    pub fn trust_proxies(mut self, proxies: &[IpAddr]) -> Self {
        self.trusted_proxies = Arc::from(proxies);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            store: self.store.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    store: Arc<dyn RateLimitStore>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = client_key(&req, &self.trusted_proxies);

        match self.store.hit(&client, Instant::now()) {
            RateLimitDecision::Limited { retry_after } => {
                let retry_after_secs = retry_after_secs(retry_after);
                warn!(
                    remote_addr = %client,
                    path = %req.path(),
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                let response = AppError::RateLimited { retry_after_secs }.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
            RateLimitDecision::Allowed { limit, remaining } => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let mut res = fut.await?;
                    let headers = res.headers_mut();
                    headers.insert(HeaderName::from_static(LIMIT_HEADER), HeaderValue::from(limit));
                    headers.insert(
                        HeaderName::from_static(REMAINING_HEADER),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                })
            }
        }
    }
}
