//! HTTP client wrapper for the document-intelligence service.

use crate::api::filters::DocumentFilters;
use crate::api::types::{
    ApiError, BatchResponse, DocumentListResponse, DocumentRecord, DownloadResponse, FilePayload,
    QuotaErrorBody, ServiceHealth, UploadResponse,
};
use crate::config::get_config;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

/// Static identity attached to every request.
///
/// The client never manages authentication; it only forwards whatever the
/// hosting application configured.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Tenant identifier sent as `x-tenant-id`.
    pub tenant_id: String,
    /// User identifier sent as `x-user-id`.
    pub user_id: String,
    /// Optional gateway subscription key.
    pub subscription_key: Option<String>,
}

/// Subset of the service boundary consumed by the queue, poller, and
/// listing components. Kept narrow so tests can script it.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Submit one file for processing.
    async fn upload_document(&self, file: &FilePayload) -> Result<UploadResponse, ApiError>;

    /// Submit several files as one batch; only the aggregate outcome is reported.
    async fn upload_batch(&self, files: &[Arc<FilePayload>]) -> Result<BatchResponse, ApiError>;

    /// Fetch the current record for a submitted document.
    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError>;

    /// List documents matching the filter set.
    async fn list_documents(
        &self,
        filters: &DocumentFilters,
    ) -> Result<DocumentListResponse, ApiError>;
}

/// Lightweight HTTP client for document-service operations.
pub struct DocumentService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) identity: Identity,
}

impl DocumentService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, ApiError> {
        let config = get_config();
        let identity = Identity {
            tenant_id: config.tenant_id.clone(),
            user_id: config.user_id.clone(),
            subscription_key: config.subscription_key.clone(),
        };
        Self::with_base_url(&config.api_base_url, identity)
    }

    /// Construct a client against an explicit base URL.
    pub fn with_base_url(base_url: &str, identity: Identity) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent("docingest/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(ApiError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            tenant = %identity.tenant_id,
            has_subscription_key = %identity
                .subscription_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized document service client"
        );

        Ok(Self {
            client,
            base_url,
            identity,
        })
    }

    /// Submit one file for processing via multipart upload.
    pub async fn upload_document(&self, file: &FilePayload) -> Result<UploadResponse, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .request(Method::POST, "documents")
            .multipart(form)
            .send()
            .await?;

        let accepted: UploadResponse = self.read_submission(response, &file.filename).await?;
        tracing::debug!(
            filename = %file.filename,
            document_id = %accepted.document_id,
            status = %accepted.status,
            "Document accepted"
        );
        Ok(accepted)
    }

    /// Submit a document by URL instead of raw bytes.
    pub async fn upload_document_from_url(
        &self,
        file_url: &str,
        file_name: Option<&str>,
    ) -> Result<UploadResponse, ApiError> {
        let mut body = json!({ "fileUrl": file_url });
        if let Some(name) = file_name {
            body.as_object_mut()
                .expect("upload body should remain an object")
                .insert("fileName".into(), Value::String(name.to_string()));
        }

        let response = self
            .request(Method::POST, "documents")
            .json(&body)
            .send()
            .await?;

        self.read_submission(response, file_url).await
    }

    /// Submit several files as one batch request.
    pub async fn upload_batch(
        &self,
        files: &[Arc<FilePayload>],
    ) -> Result<BatchResponse, ApiError> {
        let mut form = Form::new();
        for (index, file) in files.iter().enumerate() {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.content_type)?;
            form = form.part(format!("file_{index}"), part);
        }

        let response = self
            .request(Method::POST, "documents/batch")
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            let batch: BatchResponse = response.json().await?;
            tracing::debug!(
                batch_id = %batch.batch_id,
                file_count = batch.file_count,
                "Batch accepted"
            );
            Ok(batch)
        } else {
            let error = self.quota_or_status_error(response).await;
            tracing::error!(files = files.len(), error = %error, "Batch upload failed");
            Err(error)
        }
    }

    /// Fetch the full record for a submitted document.
    pub async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError> {
        let response = self
            .request(Method::GET, &format!("documents/{document_id}"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = self.status_error(response).await;
            tracing::error!(document_id, error = %error, "Failed to fetch document");
            Err(error)
        }
    }

    /// List documents matching the filter set.
    pub async fn list_documents(
        &self,
        filters: &DocumentFilters,
    ) -> Result<DocumentListResponse, ApiError> {
        let response = self
            .request(Method::GET, "documents")
            .query(&filters.to_query_pairs())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = self.status_error(response).await;
            tracing::error!(error = %error, "Failed to list documents");
            Err(error)
        }
    }

    /// Obtain a short-lived download link for a stored document.
    pub async fn download_url(&self, document_id: &str) -> Result<DownloadResponse, ApiError> {
        let response = self
            .request(Method::GET, &format!("documents/{document_id}/download"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = self.status_error(response).await;
            tracing::error!(document_id, error = %error, "Failed to obtain download link");
            Err(error)
        }
    }

    /// Delete a document and its stored artifacts.
    pub async fn delete_document(&self, document_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("documents/{document_id}"))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(document_id, "Document deleted");
            Ok(())
        } else {
            let error = self.status_error(response).await;
            tracing::error!(document_id, error = %error, "Failed to delete document");
            Err(error)
        }
    }

    /// Probe service health, including per-dependency detail.
    pub async fn health(&self) -> Result<ServiceHealth, ApiError> {
        let response = self.request(Method::GET, "health").send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = self.status_error(response).await;
            tracing::warn!(error = %error, "Health probe failed");
            Err(error)
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self
            .client
            .request(method, url)
            .header("x-tenant-id", &self.identity.tenant_id)
            .header("x-user-id", &self.identity.user_id);
        if let Some(key) = &self.identity.subscription_key
            && !key.is_empty()
        {
            req = req.header("Ocp-Apim-Subscription-Key", key);
        }
        req
    }

    async fn read_submission(
        &self,
        response: reqwest::Response,
        subject: &str,
    ) -> Result<UploadResponse, ApiError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = self.quota_or_status_error(response).await;
            tracing::error!(subject, error = %error, "Upload rejected");
            Err(error)
        }
    }

    async fn quota_or_status_error(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS
            && let Ok(quota) = serde_json::from_str::<QuotaErrorBody>(&body)
        {
            return ApiError::QuotaExceeded {
                current: quota.current,
                limit: quota.limit,
                requested: quota.requested,
            };
        }

        ApiError::UnexpectedStatus {
            status,
            message: extract_error_message(status, &body),
        }
    }

    async fn status_error(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::UnexpectedStatus {
            status,
            message: extract_error_message(status, &body),
        }
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn upload_document(&self, file: &FilePayload) -> Result<UploadResponse, ApiError> {
        DocumentService::upload_document(self, file).await
    }

    async fn upload_batch(&self, files: &[Arc<FilePayload>]) -> Result<BatchResponse, ApiError> {
        DocumentService::upload_batch(self, files).await
    }

    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError> {
        DocumentService::get_document(self, document_id).await
    }

    async fn list_documents(
        &self,
        filters: &DocumentFilters,
    ) -> Result<DocumentListResponse, ApiError> {
        DocumentService::list_documents(self, filters).await
    }
}

/// Mine a structured error body for its human-readable message.
///
/// The service reports failures as `{"error": ...}` or `{"detail": ...}`;
/// anything else falls back to the raw body, then to the status line.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
