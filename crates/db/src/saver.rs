//! Debounced snapshot writer. Captured-data mutations arrive faster than
//! they are worth persisting; the saver coalesces them and flushes the
//! latest snapshot once the stream has been quiet for the debounce period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use coplan_core::domain::ProjectSnapshot;

use crate::projects::ProjectStore;

pub struct DebouncedSaver {
    tx: mpsc::UnboundedSender<ProjectSnapshot>,
    worker: JoinHandle<()>,
}

impl DebouncedSaver {
    /// Spawns the writer task. Snapshots queued while a flush is pending
    /// replace the pending one; only the latest state ever reaches the
    /// store.
    pub fn spawn(store: Arc<dyn ProjectStore>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_writer(store, rx, debounce));
        Self { tx, worker }
    }

    /// Queues a mutated snapshot for an eventual flush. Never blocks the
    /// conversation turn.
    pub fn queue(&self, snapshot: ProjectSnapshot) {
        if self.tx.send(snapshot).is_err() {
            tracing::warn!("snapshot writer is gone, dropping save request");
        }
    }

    /// Flushes any pending snapshot and waits for the writer to exit.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(error) = self.worker.await {
            tracing::warn!(%error, "snapshot writer task ended abnormally");
        }
    }
}

async fn run_writer(
    store: Arc<dyn ProjectStore>,
    mut rx: mpsc::UnboundedReceiver<ProjectSnapshot>,
    debounce: Duration,
) {
    while let Some(first) = rx.recv().await {
        let mut latest = first;
        let deadline = tokio::time::sleep(debounce);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => {
                    flush(store.as_ref(), &latest).await;
                    break;
                }
                received = rx.recv() => match received {
                    Some(snapshot) => {
                        // Quiet-period semantics: every new write restarts
                        // the countdown.
                        latest = snapshot;
                        deadline.as_mut().set(tokio::time::sleep(debounce));
                    }
                    None => {
                        // Channel closed mid-debounce: final flush so a
                        // clean shutdown never loses the last state.
                        flush(store.as_ref(), &latest).await;
                        return;
                    }
                },
            }
        }
    }
}

async fn flush(store: &dyn ProjectStore, snapshot: &ProjectSnapshot) {
    match store.save_project(snapshot).await {
        Ok(()) => {
            tracing::debug!(project_id = %snapshot.id, "project snapshot flushed");
        }
        Err(error) => {
            // The in-memory session stays authoritative; persistence
            // failures are reported, not fatal.
            tracing::error!(project_id = %snapshot.id, %error, "failed to persist snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use coplan_core::domain::WizardContext;

    use super::*;
    use crate::projects::{InMemoryProjectStore, StoreError};

    struct CountingStore {
        inner: InMemoryProjectStore,
        saves: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self { inner: InMemoryProjectStore::default(), saves: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ProjectStore for CountingStore {
        async fn load_project(&self, id: &str) -> Result<Option<ProjectSnapshot>, StoreError> {
            self.inner.load_project(id).await
        }

        async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save_project(snapshot).await
        }

        async fn list_project_ids(&self) -> Result<Vec<String>, StoreError> {
            self.inner.list_project_ids().await
        }
    }

    fn snapshot_with_idea(idea: &str) -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::new("proj-1", WizardContext::default());
        snapshot.captured.ideation.big_idea = Some(idea.to_string());
        snapshot
    }

    #[tokio::test]
    async fn rapid_updates_coalesce_into_one_write() {
        let store = Arc::new(CountingStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), Duration::from_millis(50));

        saver.queue(snapshot_with_idea("first"));
        saver.queue(snapshot_with_idea("second"));
        saver.queue(snapshot_with_idea("third"));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        let loaded = store.load_project("proj-1").await.expect("load").expect("present");
        assert_eq!(loaded.captured.ideation.big_idea.as_deref(), Some("third"));

        saver.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_flushes_the_pending_snapshot() {
        let store = Arc::new(CountingStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), Duration::from_secs(60));

        saver.queue(snapshot_with_idea("unflushed"));
        saver.shutdown().await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        let loaded = store.load_project("proj-1").await.expect("load").expect("present");
        assert_eq!(loaded.captured.ideation.big_idea.as_deref(), Some("unflushed"));
    }

    #[tokio::test]
    async fn spaced_updates_each_get_their_own_write() {
        let store = Arc::new(CountingStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), Duration::from_millis(20));

        saver.queue(snapshot_with_idea("first"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        saver.queue(snapshot_with_idea("second"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        saver.shutdown().await;
    }
}
