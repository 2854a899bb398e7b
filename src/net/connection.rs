//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being processed
//! - Hand out guards that release their slot on drop, even on panic
//!
//! # Design Decisions
//! - Relaxed ordering for sequence ids, only uniqueness matters
//! - Guards carry a sequence id for tracing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestSeq(u64);

impl std::fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Tracks requests that are in flight.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    next_seq: AtomicU64,
    count: AtomicU64,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                next_seq: AtomicU64::new(1),
                count: AtomicU64::new(0),
            }),
        }
    }

    /// Record a new in-flight request. The slot is released when the guard drops.
    pub fn track(&self) -> RequestGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            inner: Arc::clone(&self.inner),
            seq: RequestSeq(self.inner.next_seq.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot held for the lifetime of one request.
#[derive(Debug)]
pub struct RequestGuard {
    inner: Arc<TrackerInner>,
    seq: RequestSeq,
}

impl RequestGuard {
    pub fn seq(&self) -> RequestSeq {
        self.seq
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.inner.count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(request = %self.seq, "Request finished");
    }
}
