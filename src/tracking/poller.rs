//! Status polling for submitted documents.

use crate::api::{DocumentApi, DocumentRecord};
use crate::metrics::IngestMetrics;
use crate::tracking::store::DocumentStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Notification of a tracked document's latest server-sourced state.
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// A poll observed a non-terminal status; the store was refreshed.
    Updated(DocumentRecord),
    /// A poll observed a terminal status; polling for this document stopped.
    Terminal(DocumentRecord),
}

/// Cancellation handle for one document's polling task.
struct TrackHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Converges tracked documents to their terminal status without the caller
/// managing timers.
///
/// Each [`track`](Self::track) call owns one polling task: an immediate
/// fetch, then one fetch per interval while the status is non-terminal.
/// Every successful fetch overwrites the shared [`DocumentStore`] and is
/// published as a [`TrackEvent`]. Tasks end on their own at a terminal
/// status, or cooperatively via [`stop`](Self::stop)/[`shutdown`](Self::shutdown).
pub struct StatusTracker {
    api: Arc<dyn DocumentApi>,
    store: Arc<DocumentStore>,
    interval: Duration,
    metrics: Arc<IngestMetrics>,
    events: broadcast::Sender<TrackEvent>,
    active: Mutex<HashMap<String, TrackHandle>>,
}

impl StatusTracker {
    /// Build a tracker polling at the given interval.
    pub fn new(
        api: Arc<dyn DocumentApi>,
        store: Arc<DocumentStore>,
        interval: Duration,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            store,
            interval,
            metrics,
            events,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to track events for all documents.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.events.subscribe()
    }

    /// Shared store the tracker publishes into.
    pub fn store(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Begin polling a document until it reaches a terminal status.
    ///
    /// Calling `track` for a document that is already actively tracked is a
    /// no-op, so late duplicate callers cannot race an existing poller.
    pub fn track(&self, document_id: &str) {
        let mut active = self.active.lock().expect("tracker registry poisoned");
        if let Some(handle) = active.get(document_id)
            && !handle.task.is_finished()
        {
            tracing::debug!(document_id, "Already tracking; ignoring duplicate");
            return;
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(poll_until_terminal(
            Arc::clone(&self.api),
            Arc::clone(&self.store),
            document_id.to_string(),
            self.interval,
            Arc::clone(&self.metrics),
            self.events.clone(),
            stop_rx,
        ));
        tracing::debug!(document_id, interval_ms = self.interval.as_millis() as u64, "Tracking document");
        active.insert(document_id.to_string(), TrackHandle { stop, task });
    }

    /// Whether a polling task is currently running for the document.
    pub fn is_tracking(&self, document_id: &str) -> bool {
        let active = self.active.lock().expect("tracker registry poisoned");
        active
            .get(document_id)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Cooperatively stop polling one document.
    pub fn stop(&self, document_id: &str) {
        let mut active = self.active.lock().expect("tracker registry poisoned");
        if let Some(handle) = active.remove(document_id) {
            let _ = handle.stop.send(true);
            tracing::debug!(document_id, "Stopped tracking");
        }
    }

    /// Cooperatively stop every polling task.
    pub fn shutdown(&self) {
        let mut active = self.active.lock().expect("tracker registry poisoned");
        for (document_id, handle) in active.drain() {
            let _ = handle.stop.send(true);
            tracing::debug!(document_id = %document_id, "Stopped tracking");
        }
    }

    /// Wait for the document's polling task to finish.
    ///
    /// Returns immediately when the document is not being tracked.
    pub async fn wait_until_terminal(&self, document_id: &str) {
        let handle = {
            let mut active = self.active.lock().expect("tracker registry poisoned");
            active.remove(document_id)
        };
        if let Some(handle) = handle {
            let _ = handle.task.await;
        }
    }
}

async fn poll_until_terminal(
    api: Arc<dyn DocumentApi>,
    store: Arc<DocumentStore>,
    document_id: String,
    interval: Duration,
    metrics: Arc<IngestMetrics>,
    events: broadcast::Sender<TrackEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        metrics.record_poll();
        match api.get_document(&document_id).await {
            Ok(record) => {
                let terminal = record.status.is_terminal();
                store.upsert(record.clone());
                if terminal {
                    metrics.record_terminal();
                    tracing::info!(
                        document_id = %document_id,
                        status = %record.status,
                        "Document reached terminal status"
                    );
                    let _ = events.send(TrackEvent::Terminal(record));
                    return;
                }
                tracing::debug!(document_id = %document_id, status = %record.status, "Document still processing");
                let _ = events.send(TrackEvent::Updated(record));
            }
            Err(error) => {
                // Transient poll failures stay on the fixed cadence.
                tracing::warn!(document_id = %document_id, error = %error, "Status poll failed");
            }
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!(document_id = %document_id, "Polling canceled");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, BatchResponse, DocumentFilters, DocumentListResponse, FilePayload, RemoteStatus,
        UploadResponse,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(id: &str, status: RemoteStatus) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            tenant_id: None,
            user_id: None,
            created_at: None,
            status,
            result_id: None,
            warnings: Vec::new(),
            error: None,
            extracted: None,
        }
    }

    /// Replays a scripted sequence of poll results, repeating the last one.
    struct ScriptedApi {
        polls: Mutex<VecDeque<Result<RemoteStatus, ()>>>,
        last: RemoteStatus,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(polls: Vec<Result<RemoteStatus, ()>>, last: RemoteStatus) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                last,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentApi for ScriptedApi {
        async fn upload_document(&self, _file: &FilePayload) -> Result<UploadResponse, ApiError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn upload_batch(
            &self,
            _files: &[Arc<FilePayload>],
        ) -> Result<BatchResponse, ApiError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .polls
                .lock()
                .expect("script poisoned")
                .pop_front()
                .unwrap_or(Ok(self.last));
            match next {
                Ok(status) => Ok(record(document_id, status)),
                Err(()) => Err(ApiError::UnexpectedStatus {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    message: "scripted transport failure".into(),
                }),
            }
        }

        async fn list_documents(
            &self,
            _filters: &DocumentFilters,
        ) -> Result<DocumentListResponse, ApiError> {
            unimplemented!("not exercised by poller tests")
        }
    }

    fn tracker(api: Arc<ScriptedApi>, interval_ms: u64) -> StatusTracker {
        StatusTracker::new(
            api,
            Arc::new(DocumentStore::new()),
            Duration::from_millis(interval_ms),
            Arc::new(IngestMetrics::new()),
        )
    }

    #[tokio::test]
    async fn polls_until_terminal_then_stops() {
        let api = Arc::new(ScriptedApi::new(
            vec![Ok(RemoteStatus::Submitted), Ok(RemoteStatus::Running)],
            RemoteStatus::Succeeded,
        ));
        let tracker = tracker(Arc::clone(&api), 20);
        let mut events = tracker.subscribe();

        tracker.track("doc-1");
        tracker.wait_until_terminal("doc-1").await;

        assert_eq!(api.calls(), 3);
        let store = tracker.store();
        assert_eq!(
            store.get("doc-1").map(|r| r.status),
            Some(RemoteStatus::Succeeded)
        );

        // No further polls happen once the task has observed a terminal status.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(api.calls(), 3);
        assert!(!tracker.is_tracking("doc-1"));

        let mut terminal = false;
        while let Ok(event) = events.try_recv() {
            if let TrackEvent::Terminal(record) = event {
                assert_eq!(record.status, RemoteStatus::Succeeded);
                terminal = true;
            }
        }
        assert!(terminal);
    }

    #[tokio::test]
    async fn failed_poll_is_swallowed_and_cadence_continues() {
        let api = Arc::new(ScriptedApi::new(
            vec![Ok(RemoteStatus::Running), Err(())],
            RemoteStatus::Succeeded,
        ));
        let tracker = tracker(Arc::clone(&api), 10);

        tracker.track("doc-2");
        tracker.wait_until_terminal("doc-2").await;

        // running, failed poll, succeeded
        assert_eq!(api.calls(), 3);
        assert_eq!(
            tracker.store().get("doc-2").map(|r| r.status),
            Some(RemoteStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn stop_cancels_a_nonterminal_poller() {
        let api = Arc::new(ScriptedApi::new(Vec::new(), RemoteStatus::Running));
        let tracker = tracker(Arc::clone(&api), 10);

        tracker.track("doc-3");
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(tracker.is_tracking("doc-3"));
        let calls_at_stop = api.calls();
        assert!(calls_at_stop >= 2);

        tracker.stop("doc-3");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!tracker.is_tracking("doc-3"));
        // At most one poll that was already in flight may have landed.
        assert!(api.calls() <= calls_at_stop + 1);
    }

    #[tokio::test]
    async fn duplicate_track_calls_do_not_spawn_second_poller() {
        let api = Arc::new(ScriptedApi::new(Vec::new(), RemoteStatus::Running));
        let tracker = tracker(Arc::clone(&api), 50);

        tracker.track("doc-4");
        tracker.track("doc-4");
        tokio::time::sleep(Duration::from_millis(30)).await;

        // A second poller would have doubled the immediate first fetch.
        assert_eq!(api.calls(), 1);
        tracker.shutdown();
    }
}
