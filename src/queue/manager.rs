//! Upload queue manager driving files from selection to terminal outcome.

use crate::api::{ApiError, BatchResponse, DocumentApi, FilePayload, QuotaState};
use crate::metrics::IngestMetrics;
use crate::queue::types::{
    EnqueueOutcome, QueueError, QueueEvent, RejectedFile, UploadItem, UploadLimits, UploadStatus,
    ValidateError,
};
use crate::queue::validate::validate_file;
use crate::tracking::StatusTracker;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Fixed increment applied by the simulated-progress timer.
const PROGRESS_STEP: u8 = 10;
/// Cadence of the simulated-progress timer.
const PROGRESS_TICK: Duration = Duration::from_millis(200);
/// Simulated progress never reaches 100 before the service responds.
const PROGRESS_CEILING: u8 = 90;

#[derive(Default)]
struct QueueState {
    items: Vec<UploadItem>,
    quota: Option<QuotaState>,
}

/// Owns the list of files selected for upload and drives each through
/// submission.
///
/// The queue holds the only mutable copy of its [`UploadItem`]s; every
/// state transition is published as a [`QueueEvent`]. Progress while a
/// request is in flight is simulated on a fixed timer because the service
/// reports no byte-level transfer progress.
pub struct UploadQueue {
    api: Arc<dyn DocumentApi>,
    tracker: Option<Arc<StatusTracker>>,
    metrics: Arc<IngestMetrics>,
    limits: UploadLimits,
    state: Arc<Mutex<QueueState>>,
    events: broadcast::Sender<QueueEvent>,
}

impl UploadQueue {
    /// Build a queue submitting through the given service boundary.
    pub fn new(api: Arc<dyn DocumentApi>, limits: UploadLimits, metrics: Arc<IngestMetrics>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            tracker: None,
            metrics,
            limits,
            state: Arc::new(Mutex::new(QueueState::default())),
            events,
        }
    }

    /// Hand successful uploads to a status tracker automatically.
    pub fn with_tracker(mut self, tracker: Arc<StatusTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Subscribe to queue state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Validate and append selected files, preserving selection order.
    ///
    /// Rejected files never enter the queue and never reach the network;
    /// each rejection carries a typed reason. No network activity is
    /// started here.
    pub fn enqueue(&self, files: Vec<FilePayload>) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::default();
        let mut state = self.state.lock().expect("queue state poisoned");

        for file in files {
            if state.items.len() >= self.limits.max_files {
                tracing::warn!(filename = %file.filename, max = self.limits.max_files, "Queue full; file rejected");
                outcome.rejected.push(RejectedFile {
                    filename: file.filename,
                    reason: ValidateError::QueueFull {
                        max: self.limits.max_files,
                    },
                });
                continue;
            }

            match validate_file(&file, &self.limits) {
                Ok(()) => {
                    let item = UploadItem::new(file);
                    tracing::debug!(item_id = %item.id, filename = %item.file.filename, "File enqueued");
                    let _ = self.events.send(QueueEvent::Enqueued { item_id: item.id });
                    outcome.accepted.push(item.id);
                    state.items.push(item);
                }
                Err(reason) => {
                    tracing::warn!(filename = %file.filename, reason = %reason, "File rejected");
                    outcome.rejected.push(RejectedFile {
                        filename: file.filename,
                        reason,
                    });
                }
            }
        }

        outcome
    }

    /// Submit one pending item and settle it to `Success` or `Error`.
    ///
    /// Returns the server-assigned document identifier on success. On
    /// failure the item keeps an error message, a quota rejection
    /// additionally populates [`QuotaState`], and the error is returned to
    /// the caller as well.
    pub async fn submit_one(&self, item_id: Uuid) -> Result<String, QueueError> {
        let file = {
            let mut state = self.state.lock().expect("queue state poisoned");
            let item = state
                .items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or(QueueError::UnknownItem(item_id))?;
            if item.status != UploadStatus::Pending {
                return Err(QueueError::NotPending(item_id));
            }
            item.status = UploadStatus::Uploading;
            Arc::clone(&item.file)
        };
        let _ = self.events.send(QueueEvent::Uploading { item_id });
        tracing::info!(item_id = %item_id, filename = %file.filename, "Uploading document");

        let ticker = self.spawn_progress_ticker(item_id);
        let result = self.api.upload_document(&file).await;
        ticker.abort();

        match result {
            Ok(accepted) => {
                {
                    let mut state = self.state.lock().expect("queue state poisoned");
                    state.quota = None;
                    if let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) {
                        item.status = UploadStatus::Success;
                        item.progress = 100;
                        item.document_id = Some(accepted.document_id.clone());
                    }
                }
                self.metrics.record_upload_succeeded();
                let _ = self.events.send(QueueEvent::Succeeded {
                    item_id,
                    document_id: accepted.document_id.clone(),
                });
                if let Some(tracker) = &self.tracker {
                    tracker.track(&accepted.document_id);
                }
                Ok(accepted.document_id)
            }
            Err(error) => {
                let message = error.to_string();
                {
                    let mut state = self.state.lock().expect("queue state poisoned");
                    if let ApiError::QuotaExceeded { current, limit, .. } = &error {
                        state.quota = Some(QuotaState {
                            current: *current,
                            limit: *limit,
                        });
                    }
                    if let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) {
                        item.status = UploadStatus::Error;
                        item.error = Some(message.clone());
                    }
                }
                self.metrics.record_upload_failed();
                tracing::error!(item_id = %item_id, error = %message, "Upload failed");
                let _ = self.events.send(QueueEvent::Failed { item_id, message });
                Err(QueueError::Api(error))
            }
        }
    }

    /// Submit every pending item as one batch.
    ///
    /// Only the aggregate outcome is known: on success the submitted items
    /// leave the queue; on failure they stay pending for retry. Returns
    /// `None` when nothing is pending.
    pub async fn submit_batch(&self) -> Result<Option<BatchResponse>, QueueError> {
        let (ids, files): (Vec<Uuid>, Vec<Arc<FilePayload>>) = {
            let state = self.state.lock().expect("queue state poisoned");
            state
                .items
                .iter()
                .filter(|item| item.status == UploadStatus::Pending)
                .map(|item| (item.id, Arc::clone(&item.file)))
                .unzip()
        };
        if files.is_empty() {
            return Ok(None);
        }

        tracing::info!(files = files.len(), "Submitting batch");
        match self.api.upload_batch(&files).await {
            Ok(batch) => {
                {
                    let mut state = self.state.lock().expect("queue state poisoned");
                    state.quota = None;
                    state.items.retain(|item| !ids.contains(&item.id));
                }
                self.metrics.record_batch_submitted();
                let _ = self.events.send(QueueEvent::BatchSubmitted {
                    batch_id: batch.batch_id.clone(),
                    file_count: batch.file_count,
                });
                Ok(Some(batch))
            }
            Err(error) => {
                if let ApiError::QuotaExceeded { current, limit, .. } = &error {
                    let mut state = self.state.lock().expect("queue state poisoned");
                    state.quota = Some(QuotaState {
                        current: *current,
                        limit: *limit,
                    });
                }
                tracing::error!(files = ids.len(), error = %error, "Batch submission failed; items stay pending");
                Err(QueueError::Api(error))
            }
        }
    }

    /// Remove an item from the queue.
    ///
    /// Rejected while the item's submission is in flight; the request
    /// itself cannot be canceled and must not vanish from bookkeeping.
    pub fn remove(&self, item_id: Uuid) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        let index = state
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(QueueError::UnknownItem(item_id))?;
        if state.items[index].status == UploadStatus::Uploading {
            return Err(QueueError::InFlight(item_id));
        }
        state.items.remove(index);
        let _ = self.events.send(QueueEvent::Removed { item_id });
        Ok(())
    }

    /// Remove every pending item, leaving all others untouched.
    pub fn clear_pending(&self) -> usize {
        let mut state = self.state.lock().expect("queue state poisoned");
        let before = state.items.len();
        state
            .items
            .retain(|item| item.status != UploadStatus::Pending);
        let removed = before - state.items.len();
        if removed > 0 {
            let _ = self.events.send(QueueEvent::PendingCleared { removed });
        }
        removed
    }

    /// Copy out the queue in selection order.
    pub fn snapshot(&self) -> Vec<UploadItem> {
        self.state
            .lock()
            .expect("queue state poisoned")
            .items
            .clone()
    }

    /// Copy out one item.
    pub fn item(&self, item_id: Uuid) -> Option<UploadItem> {
        self.state
            .lock()
            .expect("queue state poisoned")
            .items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
    }

    /// Capacity pair from the most recent quota rejection, if any.
    pub fn quota(&self) -> Option<QuotaState> {
        self.state.lock().expect("queue state poisoned").quota
    }

    /// Advance an in-flight item's progress on a fixed timer.
    ///
    /// The service reports no transfer progress, so this is simulated:
    /// a fixed step per tick, capped below 100 until the response lands.
    fn spawn_progress_ticker(&self, item_id: Uuid) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(PROGRESS_TICK).await;
                let progress = {
                    let mut state = state.lock().expect("queue state poisoned");
                    let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) else {
                        return;
                    };
                    if item.status != UploadStatus::Uploading {
                        return;
                    }
                    item.progress = item.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CEILING);
                    item.progress
                };
                let _ = events.send(QueueEvent::Progress { item_id, progress });
            }
        })
    }
}
