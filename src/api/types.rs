//! Shared types used by the document-service client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while interacting with the document service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service rejected a submission because the tenant is at capacity.
    #[error("Quota limit exceeded: {current}/{limit} documents processing")]
    QuotaExceeded {
        /// Documents currently in flight for the tenant.
        current: u64,
        /// Maximum documents the tenant may have in flight.
        limit: u64,
        /// Number of documents the rejected request asked to add.
        requested: u64,
    },
    /// The service responded with an unexpected status code.
    #[error("Unexpected service response ({status}): {message}")]
    UnexpectedStatus {
        /// HTTP status returned from the service.
        status: StatusCode,
        /// Message extracted from the failing response body.
        message: String,
    },
}

/// In-flight capacity pair surfaced after a quota rejection.
///
/// Derived from the structured 429 body; cleared implicitly by the next
/// accepted submission. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    /// Documents currently in flight for the tenant.
    pub current: u64,
    /// Maximum documents the tenant may have in flight.
    pub limit: u64,
}

/// One file handed to the API boundary for upload.
#[derive(Debug, Clone)]
pub struct FilePayload {
    /// Original filename as selected by the user.
    pub filename: String,
    /// MIME content type of the payload.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl FilePayload {
    /// Wrap a payload for shared ownership across queue items and requests.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Remote processing status reported by the service.
///
/// `submitted` and `running` are the non-terminal set; every other value,
/// including vocabulary this client does not know yet, is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    /// Accepted by the service, processing not yet started.
    Submitted,
    /// Processing in progress.
    Running,
    /// Processing finished and results are available.
    Succeeded,
    /// Stored without further processing (legacy vocabulary).
    Stored,
    /// Processing failed.
    Failed,
    /// Processing was canceled server-side.
    Canceled,
    /// Processing exceeded the service's time budget.
    Timeout,
    /// Vocabulary unknown to this client; treated as terminal.
    Unknown,
}

impl RemoteStatus {
    /// Whether no further remote transition can occur from this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Submitted | Self::Running)
    }
}

impl std::str::FromStr for RemoteStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "submitted" => Self::Submitted,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "stored" => Self::Stored,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "timeout" => Self::Timeout,
            _ => Self::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for RemoteStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(value.parse().unwrap_or(Self::Unknown))
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Stored => "stored",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Response to a single-document upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Identifier assigned to the document by the service.
    pub document_id: String,
    /// Identifier of the analysis result, when already allocated.
    #[serde(default)]
    pub result_id: Option<String>,
    /// Processing status at acceptance time.
    pub status: RemoteStatus,
}

/// Response to a batch upload. Only the aggregate outcome is reported.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Identifier assigned to the batch.
    pub batch_id: String,
    /// Aggregate batch status as reported by the service.
    pub status: String,
    /// Number of files the service accepted into the batch.
    pub file_count: usize,
}

/// Vendor and line-item fields extracted from a processed document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractedFields {
    /// Vendor name, when the analyzer found one.
    #[serde(default)]
    pub vendor_name: Option<String>,
    /// Extracted line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// One extracted line item.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    /// Item description.
    #[serde(default)]
    pub description: Option<String>,
    /// Quantity, when present.
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Unit price, when present.
    #[serde(default)]
    pub unit_price: Option<f64>,
    /// Line total, when present.
    #[serde(default)]
    pub total_price: Option<f64>,
}

/// Server-sourced view of a submitted document.
///
/// Always overwritten wholesale from the latest service response; never
/// mutated field-by-field on the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Server-assigned document identifier.
    pub id: String,
    /// Owning tenant, when reported.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Submitting user, when reported.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Creation timestamp in the service's RFC3339 rendering.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Current remote processing status.
    pub status: RemoteStatus,
    /// Identifier of the analysis result, when allocated.
    #[serde(default)]
    pub result_id: Option<String>,
    /// Non-fatal warnings emitted during processing.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Error detail when processing failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Structured fields extracted by the analyzer.
    #[serde(default)]
    pub extracted: Option<ExtractedFields>,
}

/// One page of the document listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    /// Records on this page.
    pub documents: Vec<DocumentRecord>,
    /// Total records matching the filter set.
    pub total: usize,
    /// Page number of this response (1-based).
    pub page: u32,
    /// Page size used by the service.
    pub page_size: u32,
    /// Total pages available for the filter set.
    pub total_pages: u32,
}

/// Short-lived download link for a stored document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// Pre-signed URL for retrieving the original file.
    pub download_url: String,
    /// Expiry timestamp of the link.
    pub expires_at: String,
}

/// Service health report with per-dependency detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    /// Aggregate health status (`healthy`, `degraded`, ...).
    pub status: String,
    /// Health of each backing dependency, keyed by name.
    #[serde(default)]
    pub dependencies: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct QuotaErrorBody {
    #[allow(dead_code)]
    pub(crate) error: String,
    pub(crate) current: u64,
    pub(crate) limit: u64,
    pub(crate) requested: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_cover_everything_but_submitted_and_running() {
        assert!(!RemoteStatus::Submitted.is_terminal());
        assert!(!RemoteStatus::Running.is_terminal());
        assert!(RemoteStatus::Succeeded.is_terminal());
        assert!(RemoteStatus::Stored.is_terminal());
        assert!(RemoteStatus::Failed.is_terminal());
        assert!(RemoteStatus::Canceled.is_terminal());
        assert!(RemoteStatus::Timeout.is_terminal());
        assert!(RemoteStatus::Unknown.is_terminal());
    }

    #[test]
    fn unknown_vocabulary_deserializes_to_unknown() {
        let status: RemoteStatus = serde_json::from_str("\"archived\"").expect("status");
        assert_eq!(status, RemoteStatus::Unknown);
        assert!(status.is_terminal());
    }

    #[test]
    fn document_record_parses_extracted_fields() {
        let record: DocumentRecord = serde_json::from_value(serde_json::json!({
            "id": "doc-7",
            "tenantId": "tenant_123",
            "userId": "user_456",
            "createdAt": "2024-08-22T21:25:00Z",
            "status": "succeeded",
            "warnings": [],
            "extracted": {
                "VendorName": "ACME Chemical Corp",
                "Items": [
                    { "Description": "Gasoline", "Quantity": 500.0, "UnitPrice": 1.25, "TotalPrice": 625.0 }
                ]
            }
        }))
        .expect("record");

        assert_eq!(record.status, RemoteStatus::Succeeded);
        let extracted = record.extracted.expect("extracted");
        assert_eq!(extracted.vendor_name.as_deref(), Some("ACME Chemical Corp"));
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].quantity, Some(500.0));
    }
}
