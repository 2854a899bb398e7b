//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (parse address, bind socket)
//!     → HTTP layer accepts connections
//!     → connection.rs (in-flight request accounting)
//!
//! notify_once.rs: one-shot notifications used by the drain handle
//! ```

pub mod connection;
pub mod listener;
pub mod notify_once;

pub use connection::{InFlightTracker, RequestGuard};
pub use notify_once::NotifyOnce;
