//! OS signal handling.
//!
//! # Responsibilities
//! - Register termination signal handlers (SIGINT, SIGTERM)
//! - Translate the first delivered signal into a [`Trigger`]
//!
//! # Design Decisions
//! - Registration is eager so no signal is lost between registration and
//!   the first poll of the serve loop
//! - On non-Unix targets only Ctrl+C is available

use std::fmt;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// The event that started a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// SIGINT or Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// The caller's cancellation token fired.
    Cancelled,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interrupt => write!(f, "interrupt"),
            Trigger::Terminate => write!(f, "terminate"),
            Trigger::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Registered interest in process termination signals.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl TerminationSignals {
    /// Register handlers for SIGINT and SIGTERM.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn register() -> Result<Self, std::io::Error> {
        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;

        tracing::trace!("Termination signal handlers registered");

        Ok(Self {
            interrupt,
            terminate,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> Result<Self, std::io::Error> {
        Ok(Self {})
    }

    /// Wait for the first termination signal.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Trigger {
        tokio::select! {
            _ = self.interrupt.recv() => Trigger::Interrupt,
            _ = self.terminate.recv() => Trigger::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Trigger {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Trigger::Interrupt,
            Err(e) => {
                tracing::error!(error = %e, "Ctrl+C handler failed");
                std::future::pending().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Interrupt.to_string(), "interrupt");
        assert_eq!(Trigger::Terminate.to_string(), "terminate");
        assert_eq!(Trigger::Cancelled.to_string(), "cancelled");
    }

    #[tokio::test]
    async fn register_inside_runtime() {
        assert!(TerminationSignals::register().is_ok());
    }
}
