//! Upload queue: validation, per-file lifecycle, and submission driving.

mod manager;
pub mod types;
pub mod validate;

pub use manager::UploadQueue;
pub use types::{
    EnqueueOutcome, QueueError, QueueEvent, RejectedFile, UploadItem, UploadLimits, UploadStatus,
    ValidateError,
};
