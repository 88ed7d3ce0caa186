//! Shared view of server-sourced document records.

use crate::api::DocumentRecord;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory map of the latest server-sourced record per document.
///
/// Records are overwritten wholesale from each service response; the store
/// never mutates fields locally. Shared between the status poller and any
/// listing surface for the lifetime of the session.
#[derive(Default)]
pub struct DocumentStore {
    records: Mutex<HashMap<String, DocumentRecord>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored record for a document with the latest response.
    pub fn upsert(&self, record: DocumentRecord) {
        let mut records = self.records.lock().expect("document store poisoned");
        records.insert(record.id.clone(), record);
    }

    /// Fetch a copy of the stored record for a document, if any.
    pub fn get(&self, document_id: &str) -> Option<DocumentRecord> {
        let records = self.records.lock().expect("document store poisoned");
        records.get(document_id).cloned()
    }

    /// Copy out every stored record.
    pub fn snapshot(&self) -> Vec<DocumentRecord> {
        let records = self.records.lock().expect("document store poisoned");
        records.values().cloned().collect()
    }

    /// Number of documents currently held.
    pub fn len(&self) -> usize {
        self.records.lock().expect("document store poisoned").len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteStatus;

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

    #[test]
    fn upsert_overwrites_wholesale() {
        let store = DocumentStore::new();
        let mut first = record("doc-1", RemoteStatus::Running);
        first.warnings.push("slow analyzer".into());
        store.upsert(first);

        store.upsert(record("doc-1", RemoteStatus::Succeeded));

        let stored = store.get("doc-1").expect("record");
        assert_eq!(stored.status, RemoteStatus::Succeeded);
        assert!(stored.warnings.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_returns_none_for_untracked_documents() {
        let store = DocumentStore::new();
        assert!(store.get("doc-9").is_none());
        assert!(store.is_empty());
    }
}
