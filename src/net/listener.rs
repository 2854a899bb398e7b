//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse the configured bind address
//! - Bind the socket, reporting failures as [`ListenError::Bind`]

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;
use crate::lifecycle::ListenError;

/// Bind to the configured address, returning the listener and the address it
/// actually bound (the resolved port when the configured one is `0`).
pub async fn bind(config: &ListenerConfig) -> Result<(TcpListener, SocketAddr), ListenError> {
    let bind_error = |source| ListenError::Bind {
        addr: config.bind_address.clone(),
        source,
    };

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}
