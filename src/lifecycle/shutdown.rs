//! Shutdown coordination for a request-serving process.
//!
//! A run drives [`Server::serve`] while waiting for a termination trigger,
//! then calls [`Server::stop_gracefully`] exactly once with a deadline derived
//! from the configured timeout:
//!
//! ```text
//! Idle → Serving → StopRequested → Draining → Stopped(outcome)
//!           │
//!           └── serve loop ends first ──────────→ Stopped(outcome)
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::server::{ListenError, Server, ShutdownError};
use crate::lifecycle::signals::{TerminationSignals, Trigger};
use crate::observability::metrics;

/// Result of a coordinated run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Listen(#[from] ListenError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    /// Termination signal handlers could not be installed.
    #[error("failed to register termination signals: {0}")]
    Signal(#[source] std::io::Error),
}

impl Error {
    /// Whether the run ended because the drain deadline elapsed.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Error::Shutdown(ShutdownError::DeadlineExceeded))
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    TimeoutExceeded,
    ListenError,
    ShutdownError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::TimeoutExceeded => "timeout_exceeded",
            Outcome::ListenError => "listen_error",
            Outcome::ShutdownError => "shutdown_error",
        }
    }

    fn of(result: &Result<(), Error>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(Error::Listen(_)) => Outcome::ListenError,
            Err(e) if e.is_deadline_exceeded() => Outcome::TimeoutExceeded,
            Err(_) => Outcome::ShutdownError,
        }
    }
}

/// Lifecycle phase of a coordinated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Serving,
    StopRequested(Trigger),
    Draining,
    Stopped(Outcome),
}

impl Phase {
    /// Terminal phases are never left.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Stopped(_))
    }
}

/// Coordinator for graceful shutdown.
///
/// Each coordinator performs a single run; `run` consumes it.
pub struct Coordinator {
    /// Drain timeout. Zero waits indefinitely.
    timeout: Duration,
    /// Optional programmatic trigger raced against OS signals.
    cancel: Option<CancellationToken>,
    phase: watch::Sender<Phase>,
    /// Every transition, for observers that must not miss intermediate phases.
    transitions: broadcast::Sender<Phase>,
}

impl Coordinator {
    /// Create a coordinator that drains for at most `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        // A run makes at most four transitions.
        let (transitions, _) = broadcast::channel(4);
        Self {
            timeout,
            cancel: None,
            phase,
            transitions,
        }
    }

    /// Also start the shutdown when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Subscribe to phase changes. The receiver keeps the final phase after
    /// the run returns.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Subscribe to every phase transition in order. Unlike [`phase`](Self::phase)
    /// no intermediate phase is coalesced away.
    pub fn transitions(&self) -> broadcast::Receiver<Phase> {
        self.transitions.subscribe()
    }

    /// Serve until SIGINT/SIGTERM (or the cancellation token), then drain.
    pub async fn run<S: Server>(self, server: &S) -> Result<(), Error> {
        // Registered before the serve loop is first polled.
        let mut signals = TerminationSignals::register().map_err(Error::Signal)?;
        let cancel = self.cancel.clone();

        let trigger = async move {
            match cancel {
                Some(token) => tokio::select! {
                    trigger = signals.recv() => trigger,
                    _ = token.cancelled() => Trigger::Cancelled,
                },
                None => signals.recv().await,
            }
        };

        self.run_until(server, trigger).await
    }

    /// Serve until `trigger` resolves, then drain.
    ///
    /// A serve loop that ends before the trigger ends the run without calling
    /// `stop_gracefully`.
    pub async fn run_until<S, F>(self, server: &S, trigger: F) -> Result<(), Error>
    where
        S: Server,
        F: Future<Output = Trigger>,
    {
        let serve = server.serve();
        tokio::pin!(serve);
        tokio::pin!(trigger);

        self.transition(Phase::Serving);

        let trigger = tokio::select! {
            biased;
            served = &mut serve => {
                let result = served.map_err(Error::from);
                self.finish(&result);
                return result;
            }
            fired = &mut trigger => fired,
        };

        tracing::info!(%trigger, timeout = ?self.timeout, "Shutdown triggered");
        self.transition(Phase::StopRequested(trigger));

        let deadline = if self.timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + self.timeout)
        };

        self.transition(Phase::Draining);
        let (served, stopped) = tokio::join!(serve, server.stop_gracefully(deadline));

        // A serve loop failure outranks the stop result.
        let result = match (served, stopped) {
            (Err(e), _) => Err(Error::Listen(e)),
            (Ok(()), stopped) => stopped.map_err(Error::from),
        };

        self.finish(&result);
        result
    }

    fn finish(&self, result: &Result<(), Error>) {
        let outcome = Outcome::of(result);
        metrics::record_shutdown(outcome.as_str());
        self.transition(Phase::Stopped(outcome));
    }

    fn transition(&self, next: Phase) {
        let previous = self.phase.send_replace(next);
        let _ = self.transitions.send(next);
        debug_assert!(!previous.is_terminal(), "left terminal phase {previous:?}");
        tracing::debug!(from = ?previous, to = ?next, "Shutdown phase changed");
    }
}

/// Serve `server` and drain it for at most `timeout` on SIGINT/SIGTERM.
///
/// A zero `timeout` waits for in-flight work indefinitely.
pub async fn start<S: Server>(server: &S, timeout: Duration) -> Result<(), Error> {
    Coordinator::new(timeout).run(server).await
}

/// Like [`start`], but `token` also triggers the shutdown.
pub async fn start_with_cancellation<S: Server>(
    server: &S,
    timeout: Duration,
    token: CancellationToken,
) -> Result<(), Error> {
    Coordinator::new(timeout)
        .with_cancellation(token)
        .run(server)
        .await
}

/// Coordinate the shutdown of `server`. Same sequencing as [`start`].
pub async fn shutdown<S: Server>(server: &S, timeout: Duration) -> Result<(), Error> {
    start(server, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant as StdInstant;

    /// In-memory server whose in-flight work takes `work` to drain.
    #[derive(Default)]
    struct MockServer {
        work: Duration,
        bind_fails: bool,
        exits_early: bool,
        serve_fails_on_stop: bool,
        stop_fails: bool,
        stopped: CancellationToken,
        stop_calls: AtomicUsize,
    }

    impl Server for MockServer {
        async fn serve(&self) -> Result<(), ListenError> {
            if self.bind_fails {
                return Err(ListenError::Bind {
                    addr: "127.0.0.1:1".into(),
                    source: std::io::ErrorKind::AddrInUse.into(),
                });
            }
            if self.exits_early {
                return Ok(());
            }
            self.stopped.cancelled().await;
            if self.serve_fails_on_stop {
                return Err(ListenError::Serve(std::io::ErrorKind::BrokenPipe.into()));
            }
            Ok(())
        }

        async fn stop_gracefully(&self, deadline: Option<Instant>) -> Result<(), ShutdownError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.stopped.cancel();
            if self.stop_fails {
                return Err(ShutdownError::Other("close failed".into()));
            }
            let drain = tokio::time::sleep(self.work);
            match deadline {
                None => drain.await,
                Some(deadline) => tokio::time::timeout_at(deadline, drain)
                    .await
                    .map_err(|_| ShutdownError::DeadlineExceeded)?,
            }
            Ok(())
        }
    }

    fn after(ms: u64) -> impl Future<Output = Trigger> {
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Trigger::Cancelled
        }
    }

    #[tokio::test]
    async fn drains_within_timeout() {
        let server = MockServer {
            work: Duration::from_millis(100),
            ..Default::default()
        };

        let start = StdInstant::now();
        let result = Coordinator::new(Duration::from_millis(500))
            .run_until(&server, after(10))
            .await;

        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(server.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_exceeded_when_work_outlasts_timeout() {
        let server = MockServer {
            work: Duration::from_millis(500),
            ..Default::default()
        };

        let start = StdInstant::now();
        let err = Coordinator::new(Duration::from_millis(50))
            .run_until(&server, after(10))
            .await
            .unwrap_err();

        assert!(err.is_deadline_exceeded());
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn zero_timeout_waits_for_work() {
        let server = MockServer {
            work: Duration::from_millis(200),
            ..Default::default()
        };

        let start = StdInstant::now();
        let result = Coordinator::new(Duration::ZERO)
            .run_until(&server, after(0))
            .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn listen_error_without_trigger() {
        let server = MockServer {
            bind_fails: true,
            ..Default::default()
        };

        let coordinator = Coordinator::new(Duration::from_secs(1));
        let phase = coordinator.phase();
        let err = coordinator
            .run_until(&server, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Listen(ListenError::Bind { .. })));
        assert_eq!(server.stop_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*phase.borrow(), Phase::Stopped(Outcome::ListenError));
    }

    #[tokio::test]
    async fn serve_error_outranks_stop_error() {
        let server = MockServer {
            serve_fails_on_stop: true,
            stop_fails: true,
            ..Default::default()
        };

        let err = Coordinator::new(Duration::from_secs(1))
            .run_until(&server, after(0))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Listen(ListenError::Serve(_))));
    }

    #[tokio::test]
    async fn stop_error_surfaces_verbatim() {
        let server = MockServer {
            stop_fails: true,
            ..Default::default()
        };

        let err = Coordinator::new(Duration::from_secs(1))
            .run_until(&server, after(0))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Shutdown(ShutdownError::Other(_))));
        assert_eq!(err.to_string(), "shutdown failed: close failed");
    }

    #[tokio::test]
    async fn transitions_follow_state_machine() {
        let server = MockServer::default();
        let coordinator = Coordinator::new(Duration::from_secs(1));
        let phase = coordinator.phase();
        let mut transitions = coordinator.transitions();
        assert_eq!(*phase.borrow(), Phase::Idle);

        let result = coordinator.run_until(&server, after(20)).await;
        assert!(result.is_ok());

        let mut seen = Vec::new();
        while let Ok(next) = transitions.try_recv() {
            seen.push(next);
        }
        assert_eq!(
            seen,
            [
                Phase::Serving,
                Phase::StopRequested(Trigger::Cancelled),
                Phase::Draining,
                Phase::Stopped(Outcome::Success),
            ]
        );
        assert_eq!(*phase.borrow(), Phase::Stopped(Outcome::Success));
    }

    #[tokio::test]
    async fn serve_ending_before_trigger_skips_stop() {
        let server = MockServer {
            exits_early: true,
            ..Default::default()
        };

        let coordinator = Coordinator::new(Duration::from_secs(1));
        let phase = coordinator.phase();
        let mut transitions = coordinator.transitions();

        let result = coordinator
            .run_until(&server, std::future::pending())
            .await;

        assert!(result.is_ok());
        assert_eq!(server.stop_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*phase.borrow(), Phase::Stopped(Outcome::Success));
        assert_eq!(transitions.try_recv().unwrap(), Phase::Serving);
        assert_eq!(
            transitions.try_recv().unwrap(),
            Phase::Stopped(Outcome::Success)
        );
    }

    #[tokio::test]
    async fn cancellation_token_triggers_single_drain() {
        let server = MockServer::default();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
            canceller.cancel();
        });

        let result = start_with_cancellation(&server, Duration::from_secs(1), token).await;

        assert!(result.is_ok());
        assert_eq!(server.stop_calls.load(Ordering::SeqCst), 1);
    }
}
