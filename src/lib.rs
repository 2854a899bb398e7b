//! Graceful shutdown for request-serving processes.
//!
//! Serve until SIGINT/SIGTERM (or a cancellation token), stop accepting new
//! work, and give in-flight requests a bounded time to finish.
//!
//! ```no_run
//! use std::time::Duration;
//! use graceful_server::{config::ServerConfig, http::HttpServer, lifecycle};
//!
//! # async fn run() -> Result<(), lifecycle::Error> {
//! let server = HttpServer::new(ServerConfig::default());
//! lifecycle::start(&server, Duration::from_secs(10)).await
//! # }
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{start, start_with_cancellation, Coordinator, Server};
