//! Liveness and readiness endpoints.
//!
//! `GET /healthz` answers 200 as soon as the listener is up. `GET /readyz`
//! answers 503 until startup reconciliation has completed, then 200, so a
//! readiness probe keeps traffic-independent orchestration from considering
//! the process live before it has rebuilt its silence tracking.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{HelperError, Result};

/// Shared flag flipped once startup reconciliation has completed.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    /// Create a flag in the not-ready state.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Mark startup as complete.
    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether startup has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(readiness): State<Readiness>) -> (StatusCode, &'static str) {
    if readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

/// Build the health router.
pub fn router(readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(readiness)
}

/// Bind the health listener.
///
/// Kept separate from [`serve`] so an unusable address fails startup
/// instead of surfacing from a background task mid-run.
///
/// # Errors
///
/// Returns an error if binding to the address fails.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| HelperError::BindFailed(addr, err))
}

/// Serve the health endpoints until the shutdown future completes.
///
/// # Errors
///
/// Returns an error if the server fails while serving.
pub async fn serve<F>(listener: TcpListener, readiness: Readiness, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "health server listening");
    }

    axum::serve(listener, router(readiness))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| HelperError::Health(err.to_string()))?;

    info!("health server shut down");
    Ok(())
}
