//! Ping command: the long-poll heartbeat engine (§4.7).
//!
//! A Ping blocks until either a change notification arrives for one of the
//! requested folders or the heartbeat deadline elapses. The subscription is
//! always torn down on the way out, including when the caller's future is
//! dropped before either event fires (cancellation) — the axum handler
//! future backing a Ping request is exactly the kind of thing a client
//! disconnect cancels mid-wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::collaborators::{ChangeNotifier, ChangeSignal};
use crate::error::SyncResult;

pub const HEARTBEAT_MIN_SECS: u32 = 300;
pub const HEARTBEAT_MAX_SECS: u32 = 1800;
pub const HEARTBEAT_DEFAULT_SECS: u32 = 540;

/// WBXML Status codes this handler can produce.
pub mod status {
    /// Heartbeat expired with no change; client should Ping again.
    pub const NO_CHANGES: u8 = 1;
    /// One or more subscribed folders changed.
    pub const CHANGES_FOUND: u8 = 2;
}

pub struct PingOutcome {
    pub status: u8,
    /// Folder ids that changed, when `status == CHANGES_FOUND`.
    pub changed_folder_ids: Vec<String>,
}

/// Clamps a client-requested heartbeat into the allowed range, substituting
/// the default when the client didn't send one.
pub fn resolve_heartbeat(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(HEARTBEAT_DEFAULT_SECS)
        .clamp(HEARTBEAT_MIN_SECS, HEARTBEAT_MAX_SECS)
}

/// Holds a live subscription and unsubscribes it exactly once, either
/// inline on normal completion or, if dropped while still armed (the
/// `wait_for_change` future got cancelled), by spawning a detached task —
/// `unsubscribe` is async and `Drop` cannot await it directly.
struct SubscriptionGuard<N: ChangeNotifier + 'static> {
    notifier: Arc<N>,
    signal: Option<N::Signal>,
}

impl<N: ChangeNotifier + 'static> SubscriptionGuard<N> {
    async fn disarm(&mut self) {
        if let Some(signal) = self.signal.take() {
            self.notifier.unsubscribe(signal).await;
        }
    }
}

impl<N: ChangeNotifier + 'static> Drop for SubscriptionGuard<N> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            let notifier = self.notifier.clone();
            tokio::spawn(async move {
                notifier.unsubscribe(signal).await;
            });
        }
    }
}

/// Waits for a folder change or heartbeat expiry, whichever comes first.
///
/// `notifier.subscribe` must arm the subscription before returning, so a
/// change landing between `subscribe()` and the first `wait()` poll is
/// never missed. `notifier` is an `Arc` rather than a borrow so the
/// cancellation-safe unsubscribe path can outlive this call.
pub async fn wait_for_change<N: ChangeNotifier + 'static>(
    notifier: Arc<N>,
    user_id: &str,
    folder_ids: &[String],
    heartbeat_secs: u32,
) -> SyncResult<PingOutcome> {
    let signal = notifier.subscribe(user_id, folder_ids).await?;
    let mut guard = SubscriptionGuard {
        notifier: notifier.clone(),
        signal: Some(signal),
    };

    let outcome = tokio::select! {
        _ = guard.signal.as_mut().expect("just armed").wait() => PingOutcome {
            status: status::CHANGES_FOUND,
            changed_folder_ids: folder_ids.to_vec(),
        },
        _ = time::sleep(Duration::from_secs(heartbeat_secs as u64)) => PingOutcome {
            status: status::NO_CHANGES,
            changed_folder_ids: Vec::new(),
        },
    };

    guard.disarm().await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[test]
    fn test_resolve_heartbeat_clamps_low() {
        assert_eq!(resolve_heartbeat(Some(10)), HEARTBEAT_MIN_SECS);
    }

    #[test]
    fn test_resolve_heartbeat_clamps_high() {
        assert_eq!(resolve_heartbeat(Some(100_000)), HEARTBEAT_MAX_SECS);
    }

    #[test]
    fn test_resolve_heartbeat_defaults() {
        assert_eq!(resolve_heartbeat(None), HEARTBEAT_DEFAULT_SECS);
    }

    struct TestSignal {
        notify: Arc<Notify>,
    }

    impl ChangeSignal for TestSignal {
        async fn wait(&mut self) {
            self.notify.notified().await;
        }
    }

    struct TestNotifier {
        notify: Arc<Notify>,
        subscribe_count: AtomicUsize,
        unsubscribe_count: Arc<AtomicUsize>,
    }

    impl ChangeNotifier for TestNotifier {
        type Signal = TestSignal;

        async fn subscribe(&self, _user_id: &str, _folder_ids: &[String]) -> SyncResult<Self::Signal> {
            self.subscribe_count.fetch_add(1, Ordering::SeqCst);
            Ok(TestSignal { notify: self.notify.clone() })
        }

        async fn unsubscribe(&self, _signal: Self::Signal) {
            self.unsubscribe_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_change_notification_wins_over_heartbeat() {
        let notify = Arc::new(Notify::new());
        let unsubscribe_count = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(TestNotifier {
            notify: notify.clone(),
            subscribe_count: AtomicUsize::new(0),
            unsubscribe_count: unsubscribe_count.clone(),
        });

        let folders = vec!["2".to_string()];
        let wait = wait_for_change(notifier, "alice", &folders, HEARTBEAT_MAX_SECS);
        notify.notify_one();
        let outcome = wait.await.unwrap();

        assert_eq!(outcome.status, status::CHANGES_FOUND);
        assert_eq!(outcome.changed_folder_ids, folders);
        assert_eq!(unsubscribe_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_expiry_with_no_notification() {
        let unsubscribe_count = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(TestNotifier {
            notify: Arc::new(Notify::new()),
            subscribe_count: AtomicUsize::new(0),
            unsubscribe_count: unsubscribe_count.clone(),
        });

        let folders = vec!["2".to_string()];
        let outcome = wait_for_change(notifier, "alice", &folders, HEARTBEAT_MIN_SECS)
            .await
            .unwrap();

        assert_eq!(outcome.status, status::NO_CHANGES);
        assert!(outcome.changed_folder_ids.is_empty());
        assert_eq!(unsubscribe_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_still_unsubscribes() {
        let unsubscribe_count = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(TestNotifier {
            notify: Arc::new(Notify::new()),
            subscribe_count: AtomicUsize::new(0),
            unsubscribe_count: unsubscribe_count.clone(),
        });

        let folders = vec!["2".to_string()];
        {
            let wait = wait_for_change(notifier, "alice", &folders, HEARTBEAT_MAX_SECS);
            tokio::pin!(wait);
            // Poll once to subscribe and register in the select, then drop
            // the future before either branch resolves.
            let _ = futures_util_poll_once(&mut wait).await;
        }
        // The guard's Drop spawned a detached unsubscribe task; yield so
        // the runtime gets a chance to run it.
        tokio::task::yield_now().await;
        assert_eq!(unsubscribe_count.load(Ordering::SeqCst), 1);
    }

    /// Polls a future exactly once without requiring the `futures` crate,
    /// just enough to drive `wait_for_change` past `subscribe()`.
    async fn futures_util_poll_once<F: std::future::Future + Unpin>(fut: &mut F) {
        use std::task::Poll;
        std::future::poll_fn(|cx| {
            let _ = std::pin::Pin::new(&mut *fut).poll(cx);
            Poll::Ready(())
        })
        .await;
    }
}
