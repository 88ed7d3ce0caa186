//! Deduplicated document-list query sessions.

use crate::api::{ApiError, DocumentApi, DocumentFilters, DocumentListResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct BrowserState {
    applied_seq: u64,
    latest: Option<DocumentListResponse>,
}

/// One listing session over the document service.
///
/// Every [`refresh`](Self::refresh) call takes a monotonically increasing
/// sequence number; a response is applied to the shared snapshot only when
/// no later request has already been applied, so overlapping queries can
/// never let a stale response overwrite newer state.
pub struct DocumentBrowser {
    api: Arc<dyn DocumentApi>,
    issued: AtomicU64,
    state: Mutex<BrowserState>,
}

impl DocumentBrowser {
    /// Build a browser querying through the given service boundary.
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            issued: AtomicU64::new(0),
            state: Mutex::new(BrowserState::default()),
        }
    }

    /// Issue one list request and apply the response if it is still current.
    ///
    /// Returns `Ok(None)` when the response arrived after a later request
    /// had already been applied and was therefore discarded.
    pub async fn refresh(
        &self,
        filters: &DocumentFilters,
    ) -> Result<Option<DocumentListResponse>, ApiError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.api.list_documents(filters).await?;
        Ok(self.apply(ticket, response))
    }

    /// The most recently applied listing, if any.
    pub fn latest(&self) -> Option<DocumentListResponse> {
        self.state
            .lock()
            .expect("browser state poisoned")
            .latest
            .clone()
    }

    fn apply(
        &self,
        ticket: u64,
        response: DocumentListResponse,
    ) -> Option<DocumentListResponse> {
        let mut state = self.state.lock().expect("browser state poisoned");
        if ticket <= state.applied_seq {
            tracing::debug!(ticket, applied = state.applied_seq, "Discarding stale listing response");
            return None;
        }
        state.applied_seq = ticket;
        state.latest = Some(response.clone());
        Some(response)
    }
}
