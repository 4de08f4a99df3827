//! Per-client rate limiting: roughly 10 requests per minute per client,
//! enforced with a fixed-window counter.
//!
//! The counter is keyed by the caller's socket address, implemented
//! as `axum` middleware rather than a bespoke `tower::Service` — the same
//! shape the `tower-http` layers already wired up in [`super::router`] use.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Default)]
pub struct Limiter {
    limit: u32,
    windows: Mutex<HashMap<SocketAddr, (Instant, u32)>>,
}

impl Limiter {
    pub fn new(limit_per_minute: u32) -> Arc<Self> {
        Arc::new(Self {
            limit: limit_per_minute,
            windows: Mutex::new(HashMap::new()),
        })
    }

    fn admit(&self, addr: SocketAddr) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let now = Instant::now();
        let entry = windows.entry(addr).or_insert((now, 0));
        if now.duration_since(entry.0) >= WINDOW {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.limit
    }
}

/// `axum::middleware::from_fn_with_state` handler: rejects with `429` once
/// `limiter`'s per-client budget for the current window is exhausted.
pub async fn check(
    State(limiter): State<Arc<Limiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.admit(addr) {
        return (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = Limiter::new(2);
        let addr: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        assert!(limiter.admit(addr));
        assert!(limiter.admit(addr));
        assert!(!limiter.admit(addr));
    }

    #[test]
    fn separate_clients_have_separate_budgets() {
        let limiter = Limiter::new(1);
        let a: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let b: SocketAddr = "127.0.0.1:2".parse().unwrap();
        assert!(limiter.admit(a));
        assert!(limiter.admit(b));
    }
}
