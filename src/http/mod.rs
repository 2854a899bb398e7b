//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, serve loop, graceful stop)
//!     → request.rs (request ID, tracing, in-flight accounting)
//!     → handler
//!
//! Stop:
//!     handle.rs (stop requested) → axum graceful shutdown → connections drain
//!     deadline passed → handle.rs (force) → serve loop returns
//! ```

pub mod handle;
pub mod request;
pub mod server;

pub use handle::ServerHandle;
pub use request::X_REQUEST_ID;
pub use server::{demo_router, HttpServer};
