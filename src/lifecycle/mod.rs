//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger
//!
//! Shutdown (shutdown.rs):
//!     Serve ─┬─ listener fails ───────────────────────────→ Stopped(listen error)
//!            └─ Trigger → stop_gracefully(deadline) → drain → Stopped(outcome)
//!
//! Server (server.rs):
//!     serve / stop_gracefully capability driven by the coordinator
//! ```
//!
//! # Design Decisions
//! - Signal handlers are registered before serving starts
//! - Stop is invoked at most once, and only after a trigger
//! - Shutdown has timeout: the server gives up draining after the deadline

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::{ListenError, Server, ShutdownError};
pub use shutdown::{
    shutdown, start, start_with_cancellation, Coordinator, Error, Outcome, Phase,
};
pub use signals::{TerminationSignals, Trigger};
