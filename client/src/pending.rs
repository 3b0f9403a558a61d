use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

struct Inner {
    next_id: AtomicU64,
    // Tracking id -> session id, for every completion not yet settled.
    sessions: watch::Sender<BTreeMap<u64, String>>,
}

/// Registry of in-flight session completions.
///
/// A completion is registered before its task is spawned and removed when that task settles,
/// whether it succeeded, failed, panicked, or was aborted. The registry never holds a settled call.
#[derive(Clone)]
pub struct PendingCompletions {
    inner: Arc<Inner>,
}

impl Default for PendingCompletions {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its entry from the registry when dropped.
struct PendingGuard {
    id: u64,
    inner: Arc<Inner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let id = self.id;
        self.inner.sessions.send_modify(|sessions| {
            sessions.remove(&id);
        });
    }
}

impl PendingCompletions {
    pub fn new() -> Self {
        let (sessions, _) = watch::channel(BTreeMap::new());
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                sessions,
            }),
        }
    }

    fn register(&self, session_id: &str) -> PendingGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let session_id = session_id.to_string();
        self.inner.sessions.send_modify(|sessions| {
            sessions.insert(id, session_id);
        });
        PendingGuard {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Runs `fut` on its own task, tracked under `session_id` until it settles.
    ///
    /// The task keeps running if the returned handle is dropped.
    pub fn track<F, T>(&self, session_id: &str, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.register(session_id);
        tokio::spawn(async move {
            let _guard = guard;
            fut.await
        })
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.sessions.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }

    /// Session ids of unsettled completions, in issue order.
    pub fn sessions(&self) -> Vec<String> {
        self.inner.sessions.borrow().values().cloned().collect()
    }

    /// Resolves once every tracked completion has settled, regardless of outcome.
    pub async fn wait_idle(&self) {
        let mut receiver = self.inner.sessions.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver.wait_for(|sessions| sessions.is_empty()).await;
    }

    /// Logs the unsettled completions, if any, and reports whether there were some. Never blocks.
    pub fn warn_if_pending(&self, context: &str) -> bool {
        let sessions = self.sessions();
        if sessions.is_empty() {
            return false;
        }
        warn!(
            context,
            pending = sessions.len(),
            sessions = ?sessions,
            "session completions still in flight; their credit may be lost if the process exits"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_tracked_until_success() {
        let pending = PendingCompletions::new();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = pending.track("s-1", async move {
            let _ = rx.await;
            7
        });

        assert!(pending.has_pending());
        assert_eq!(pending.sessions(), vec!["s-1".to_string()]);

        tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), 7);
        assert!(!pending.has_pending());
        assert!(pending.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_tracked_until_failure() {
        let pending = PendingCompletions::new();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = pending.track("s-1", async move {
            let _ = rx.await;
            Err::<(), &str>("rejected")
        });
        assert_eq!(pending.len(), 1);

        drop(tx);
        assert!(handle.await.unwrap().is_err());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_task_is_deregistered() {
        let pending = PendingCompletions::new();
        let handle = pending.track("s-1", std::future::pending::<()>());
        assert!(pending.has_pending());

        handle.abort();
        let _ = handle.await;
        assert!(!pending.has_pending());
    }

    #[tokio::test]
    async fn test_dropping_handle_does_not_cancel() {
        let pending = PendingCompletions::new();
        let (tx, rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        drop(pending.track("s-1", async move {
            let _ = rx.await;
            let _ = done_tx.send(());
        }));

        assert!(pending.has_pending());
        tx.send(()).unwrap();
        done_rx.await.unwrap();
        timeout(Duration::from_secs(1), pending.wait_idle())
            .await
            .expect("registry should drain");
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_every_completion() {
        let pending = PendingCompletions::new();
        let (first_tx, first_rx) = oneshot::channel::<()>();
        let (second_tx, second_rx) = oneshot::channel::<()>();
        let first = pending.track("s-1", async move {
            let _ = first_rx.await;
            Ok::<(), ()>(())
        });
        let second = pending.track("s-2", async move {
            let _ = second_rx.await;
            Err::<(), ()>(())
        });
        assert_eq!(pending.len(), 2);

        first_tx.send(()).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(pending.sessions(), vec!["s-2".to_string()]);
        assert!(timeout(Duration::from_millis(50), pending.wait_idle())
            .await
            .is_err());

        second_tx.send(()).unwrap();
        timeout(Duration::from_secs(1), pending.wait_idle())
            .await
            .expect("registry should drain");
        assert!(second.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_empty() {
        let pending = PendingCompletions::new();
        assert!(!pending.warn_if_pending("test"));
        timeout(Duration::from_millis(50), pending.wait_idle())
            .await
            .expect("nothing pending");
    }

    #[tokio::test]
    async fn test_warn_if_pending_does_not_block() {
        let pending = PendingCompletions::new();
        let handle = pending.track("s-1", std::future::pending::<()>());
        assert!(pending.warn_if_pending("shutdown"));
        assert!(pending.has_pending());
        handle.abort();
    }
}
