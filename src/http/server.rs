//! HTTP server setup and graceful stop.
//!
//! # Responsibilities
//! - Build the Axum router (demo handlers or a caller-supplied one)
//! - Wire up middleware (tracing, request ID, in-flight accounting)
//! - Serve on the configured listener until stopped
//! - Drain open connections within a deadline on stop
//!
//! # Design Decisions
//! - `axum::serve` graceful shutdown stops accepting and lets connections finish
//! - The deadline is enforced by `stop_gracefully`, which then forces the
//!   serve loop to return so the caller is never held past the deadline

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use tokio::time::Instant;

use crate::config::{HandlerConfig, ServerConfig};
use crate::http::handle::ServerHandle;
use crate::http::request;
use crate::lifecycle::{ListenError, Server, ShutdownError};
use crate::net::{listener, InFlightTracker};

/// HTTP server driven by the shutdown coordinator.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    handle: ServerHandle,
    in_flight: InFlightTracker,
}

impl HttpServer {
    /// Create a server running the demo handlers.
    pub fn new(config: ServerConfig) -> Self {
        let router = demo_router(&config.handler);
        Self::with_router(config, router)
    }

    /// Create a server running `router`.
    pub fn with_router(config: ServerConfig, router: Router) -> Self {
        Self {
            router,
            config,
            handle: ServerHandle::new(),
            in_flight: InFlightTracker::new(),
        }
    }

    /// Handle for observing the server's address and stop state.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Number of requests currently being processed.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.in_flight()
    }
}

impl Server for HttpServer {
    async fn serve(&self) -> Result<(), ListenError> {
        if self.handle.is_stopping() {
            tracing::debug!("Server already stopped");
            return Ok(());
        }
        let Some(serving) = self.handle.serving() else {
            tracing::debug!("Serve loop already claimed");
            return Ok(());
        };

        let (listener, addr) = listener::bind(&self.config.listener).await?;
        serving.listening(addr);

        tracing::info!(address = %addr, "HTTP server starting");

        let app = request::instrument(self.router.clone(), self.in_flight.clone());
        let handle = self.handle.clone();
        let graceful = axum::serve(listener, app)
            .with_graceful_shutdown(async move { handle.stop_requested().await })
            .into_future();

        tokio::select! {
            served = graceful => served.map_err(ListenError::Serve)?,
            _ = self.handle.forced() => {
                tracing::warn!(
                    in_flight = self.in_flight.in_flight(),
                    "Abandoning open connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    async fn stop_gracefully(&self, deadline: Option<Instant>) -> Result<(), ShutdownError> {
        if self.handle.request_stop() {
            tracing::info!(
                in_flight = self.in_flight.in_flight(),
                grace = ?deadline.map(|d| d.saturating_duration_since(Instant::now())),
                "Stopping HTTP server, draining connections"
            );
        }

        let finished = self.handle.wait_finished();
        match deadline {
            None => finished.await,
            Some(deadline) => {
                if tokio::time::timeout_at(deadline, finished).await.is_err() {
                    tracing::warn!(
                        in_flight = self.in_flight.in_flight(),
                        "Drain deadline exceeded"
                    );
                    self.handle.force();
                    return Err(ShutdownError::DeadlineExceeded);
                }
            }
        }

        tracing::info!("Drain complete");
        Ok(())
    }
}

/// Router with the demo handlers: a slow `/` and an immediate `/healthz`.
pub fn demo_router(config: &HandlerConfig) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(Arc::new(config.clone()))
}

async fn hello(State(config): State<Arc<HandlerConfig>>) -> String {
    tokio::time::sleep(config.response_delay()).await;
    config.body.clone()
}
