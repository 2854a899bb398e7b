//! One-shot notification that stays notified.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A [`Notify`] that remembers it fired, so late waiters return immediately.
#[derive(Debug, Default)]
pub struct NotifyOnce {
    notified: AtomicBool,
    notify: Notify,
}

impl NotifyOnce {
    /// Fire the notification. Returns `true` only for the first call.
    pub fn notify_waiters(&self) -> bool {
        let first = !self.notified.swap(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        first
    }

    pub fn is_notified(&self) -> bool {
        self.notified.load(Ordering::SeqCst)
    }

    /// Wait until the notification has fired.
    pub async fn notified(&self) {
        // Registered before the flag check so a concurrent notify is not lost.
        let future = self.notify.notified();

        if !self.notified.load(Ordering::SeqCst) {
            future.await;
        }
    }
}
