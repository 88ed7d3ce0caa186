//! Remote document-service integration.

pub mod client;
pub mod filters;
/// Streaming helper for walking listing pages.
pub mod pager;
pub mod types;

pub use client::{DocumentApi, DocumentService, Identity};
pub use filters::{DocumentFilters, SortDirection};
pub use pager::stream_documents;
pub use types::{
    ApiError, BatchResponse, DocumentListResponse, DocumentRecord, DownloadResponse,
    ExtractedFields, FilePayload, LineItem, QuotaState, RemoteStatus, ServiceHealth,
    UploadResponse,
};
