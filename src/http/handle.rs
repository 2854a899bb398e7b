//! Shared handle between a running [`HttpServer`](crate::http::HttpServer)
//! and whoever stops it.
//!
//! # Responsibilities
//! - Publish the bound address once the listener is up
//! - Carry the one-shot "stop requested" and "drain abandoned" notifications
//! - Report when the serve loop has exited
//!
//! # Design Decisions
//! - Serve state lives in a watch channel so late observers see the latest value
//! - A drop guard marks the serve loop finished on every exit path

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::net::NotifyOnce;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServeState {
    Idle,
    Binding,
    Listening(SocketAddr),
    Finished,
}

/// A cloneable handle for an [`HttpServer`](crate::http::HttpServer).
#[derive(Clone, Debug)]
pub struct ServerHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    state: watch::Sender<ServeState>,
    stop: NotifyOnce,
    force: NotifyOnce,
}

impl ServerHandle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ServeState::Idle);
        Self {
            inner: Arc::new(HandleInner {
                state,
                stop: NotifyOnce::default(),
                force: NotifyOnce::default(),
            }),
        }
    }

    /// Wait until the server listens and return its local address.
    ///
    /// Returns `None` if the serve loop ends without listening, e.g. when
    /// binding fails.
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut state = self.inner.state.subscribe();
        let state = state
            .wait_for(|s| matches!(s, ServeState::Listening(_) | ServeState::Finished))
            .await;

        match state.as_deref() {
            Ok(ServeState::Listening(addr)) => Some(*addr),
            _ => None,
        }
    }

    /// Local address while the server is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.inner.state.borrow() {
            ServeState::Listening(addr) => Some(addr),
            _ => None,
        }
    }

    /// Whether a graceful stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.inner.stop.is_notified()
    }

    /// Returns `true` for the first request only.
    pub(crate) fn request_stop(&self) -> bool {
        self.inner.stop.notify_waiters()
    }

    pub(crate) async fn stop_requested(&self) {
        self.inner.stop.notified().await
    }

    /// Tell the serve loop to stop waiting for open connections.
    pub(crate) fn force(&self) {
        self.inner.force.notify_waiters();
    }

    pub(crate) async fn forced(&self) {
        self.inner.force.notified().await
    }

    /// Claim the serve loop. `None` if it already ran or is running.
    pub(crate) fn serving(&self) -> Option<ServingGuard> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ServeState::Idle {
                *state = ServeState::Binding;
                true
            } else {
                false
            }
        });

        claimed.then(|| ServingGuard {
            handle: self.clone(),
        })
    }

    /// Wait until no serve loop is running.
    pub(crate) async fn wait_finished(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state
            .wait_for(|s| matches!(s, ServeState::Idle | ServeState::Finished))
            .await;
    }
}

impl Default for ServerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by the serve loop for its whole lifetime.
pub(crate) struct ServingGuard {
    handle: ServerHandle,
}

impl ServingGuard {
    pub(crate) fn listening(&self, addr: SocketAddr) {
        self.handle
            .inner
            .state
            .send_replace(ServeState::Listening(addr));
    }
}

impl Drop for ServingGuard {
    fn drop(&mut self) {
        self.handle.inner.state.send_replace(ServeState::Finished);
    }
}
