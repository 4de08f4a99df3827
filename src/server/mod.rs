//! Optional HTTP service, compiled in only under the `server` Cargo feature
//! so a plain CLI build never pulls in `axum`/`tower`.
//!
//! The service clones into a scratch directory, renders a digest, optionally
//! persists it to the object-storage cache, and returns a structured JSON
//! response — the same [`crate::ingest::ingest`] pipeline the CLI drives,
//! just wired to `axum` instead of `clap`.

mod handlers;
mod rate_limit;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{DigestCache, InMemoryStore};
use crate::config::{CacheBackend, Config};

/// Shared state handed to every handler: the resolved config and the
/// optional digest cache (absent when `REPODIGEST_CACHE_BACKEND=disabled`).
pub struct AppState {
    pub config: Config,
    pub cache: Option<DigestCache>,
    pub downloads: handlers::DownloadStore,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let cache = match config.cache_backend {
            CacheBackend::InMemory => Some(DigestCache::new(
                Arc::new(InMemoryStore::default()),
                config.cache_key_prefix.clone(),
            )),
            CacheBackend::Disabled => None,
        };
        Self {
            config,
            cache,
            downloads: handlers::DownloadStore::default(),
        }
    }
}

/// Builds the router: `/api/ingest`, `/api/{user}/{repo}`,
/// `/api/download/file/{id}`, `/health`, wrapped in `TraceLayer`/`CorsLayer`.
/// The per-client rate limiter applies only to `/api/*` — `/health` is
/// excluded from rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    let limiter = rate_limit::Limiter::new(state.config.rate_limit_per_minute);

    let api = Router::new()
        .route("/api/ingest", post(handlers::ingest_post))
        .route("/api/{user}/{repo}", get(handlers::ingest_get))
        .route("/api/download/file/{id}", get(handlers::download_file))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::check));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves `router(state)` on `addr` until the process is signaled
/// to stop. Thin wrapper kept separate from [`router`] so tests can exercise
/// the router directly with `tower::ServiceExt::oneshot` without binding a
/// socket. Uses `into_make_service_with_connect_info` so the rate limiter's
/// `ConnectInfo<SocketAddr>` extractor resolves to the real peer address.
pub async fn serve(state: Arc<AppState>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    crate::cleanup::spawn(state.config.scratch_root.clone(), state.config.history_path.clone());

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_returns_ok_status_body() {
        let state = Arc::new(AppState::from_config(Config::from_env()));
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
    }
}
