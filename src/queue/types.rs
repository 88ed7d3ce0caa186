//! Core data types and error definitions for the upload queue.

use crate::api::{ApiError, FilePayload};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Enqueued, no network activity yet.
    Pending,
    /// Submission request currently in flight.
    Uploading,
    /// Accepted by the service; a document identifier is recorded.
    Success,
    /// Submission failed; an error message is recorded.
    Error,
}

/// One file tracked from selection to terminal outcome.
///
/// Owned exclusively by the [`super::UploadQueue`]; mutated only through
/// its operations. Exactly one of `document_id`/`error` is set once the
/// status leaves `Pending`/`Uploading`.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Session-unique identifier for this queue entry.
    pub id: Uuid,
    /// The selected file payload.
    pub file: Arc<FilePayload>,
    /// Current lifecycle state.
    pub status: UploadStatus,
    /// Simulated progress, 0–100. Reaches 100 only at `Success`.
    pub progress: u8,
    /// Server-assigned document identifier, present only at `Success`.
    pub document_id: Option<String>,
    /// Failure message, present only at `Error`.
    pub error: Option<String>,
}

impl UploadItem {
    pub(crate) fn new(file: FilePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            file: file.shared(),
            status: UploadStatus::Pending,
            progress: 0,
            document_id: None,
            error: None,
        }
    }
}

/// Reasons a file is rejected before it ever reaches the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidateError {
    /// Content type is not one the service processes.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    /// File payload is empty.
    #[error("file is empty")]
    EmptyFile,
    /// File exceeds the configured size cap.
    #[error("file is {size_bytes} bytes, exceeding the {max_bytes} byte limit")]
    TooLarge {
        /// Actual payload size.
        size_bytes: usize,
        /// Configured cap.
        max_bytes: usize,
    },
    /// The queue already holds the configured maximum number of files.
    #[error("queue already holds the maximum of {max} files")]
    QueueFull {
        /// Configured queue capacity.
        max: usize,
    },
}

/// Errors emitted by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No item with the given identifier exists in the queue.
    #[error("no upload item {0} in the queue")]
    UnknownItem(Uuid),
    /// The item has an in-flight submission and cannot be removed.
    #[error("upload item {0} is currently uploading and cannot be removed")]
    InFlight(Uuid),
    /// Only pending items may be submitted.
    #[error("upload item {0} is not pending")]
    NotPending(Uuid),
    /// The service rejected or failed the submission.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Caps applied when files are enqueued.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Per-file size cap in bytes.
    pub max_file_bytes: usize,
    /// Maximum number of files held by the queue at once.
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_files: 10,
        }
    }
}

/// A file rejected during [`super::UploadQueue::enqueue`].
#[derive(Debug, Clone)]
pub struct RejectedFile {
    /// Filename of the rejected file.
    pub filename: String,
    /// Why the file was rejected.
    pub reason: ValidateError,
}

/// Result of an enqueue call: accepted item ids plus per-file rejections.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOutcome {
    /// Identifiers of the items appended to the queue, in selection order.
    pub accepted: Vec<Uuid>,
    /// Files that never entered the queue, with typed reasons.
    pub rejected: Vec<RejectedFile>,
}

/// Push-style notification of a queue state transition.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// An item was appended to the queue.
    Enqueued {
        /// Identifier of the new item.
        item_id: Uuid,
    },
    /// An item's submission went in flight.
    Uploading {
        /// Identifier of the item.
        item_id: Uuid,
    },
    /// Simulated progress advanced for an in-flight item.
    Progress {
        /// Identifier of the item.
        item_id: Uuid,
        /// New progress value, 0–100.
        progress: u8,
    },
    /// The service accepted an item.
    Succeeded {
        /// Identifier of the item.
        item_id: Uuid,
        /// Server-assigned document identifier.
        document_id: String,
    },
    /// An item's submission failed.
    Failed {
        /// Identifier of the item.
        item_id: Uuid,
        /// Human-readable failure message.
        message: String,
    },
    /// A batch submission was accepted; its items left the queue.
    BatchSubmitted {
        /// Server-assigned batch identifier.
        batch_id: String,
        /// Number of files in the batch.
        file_count: usize,
    },
    /// An item was removed from the queue.
    Removed {
        /// Identifier of the removed item.
        item_id: Uuid,
    },
    /// Pending items were cleared.
    PendingCleared {
        /// Number of items removed.
        removed: usize,
    },
}
