//! The server capability driven by the shutdown coordinator.
//!
//! # Responsibilities
//! - Define the two operations the coordinator sequences: serve and stop
//! - Define the error taxonomy of each operation
//!
//! # Design Decisions
//! - `serve` returning `Ok(())` is the "stopped normally" sentinel
//! - Deadlines are absolute (`tokio::time::Instant`), `None` waits forever

use std::future::Future;
use tokio::time::Instant;

/// Failure of the serve loop for a reason other than an intentional stop.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The serve loop failed after the listener was bound.
    #[error("serve loop failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Failure of a graceful stop.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// The drain deadline elapsed with work still in flight.
    #[error("deadline exceeded while draining in-flight work")]
    DeadlineExceeded,

    /// Any other failure while stopping.
    #[error("shutdown failed: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A request-serving process that can be stopped gracefully.
///
/// Implementations must tolerate `stop_gracefully` being called while
/// `serve` is still running; that is the normal way a run ends.
pub trait Server: Send + Sync {
    /// Serve until stopped or until the listener fails.
    fn serve(&self) -> impl Future<Output = Result<(), ListenError>> + Send;

    /// Stop accepting new work and wait for active work to finish, giving up
    /// once `deadline` passes.
    fn stop_gracefully(
        &self,
        deadline: Option<Instant>,
    ) -> impl Future<Output = Result<(), ShutdownError>> + Send;
}
