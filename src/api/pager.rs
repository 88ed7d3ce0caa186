//! Streaming helpers for iterating the document listing without manual page loops.

use async_stream::try_stream;
use futures_core::Stream;

use super::client::DocumentApi;
use super::filters::DocumentFilters;
use super::types::{ApiError, DocumentRecord};

/// Stream every document matching the filter set, walking pages in order.
///
/// Pagination starts from `filters.page` (default 1) and follows the
/// service's `totalPages` count. Each yielded record comes from exactly one
/// listing request; the stream ends after the final page.
pub fn stream_documents<'a, A>(
    api: &'a A,
    filters: &'a DocumentFilters,
) -> impl Stream<Item = Result<DocumentRecord, ApiError>> + 'a
where
    A: DocumentApi + ?Sized,
{
    try_stream! {
        let mut page = filters.page.unwrap_or(1);

        loop {
            let mut page_filters = filters.clone();
            page_filters.page = Some(page);

            let listing = api.list_documents(&page_filters).await?;
            let total_pages = listing.total_pages;
            for record in listing.documents {
                yield record;
            }

            if total_pages == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{DocumentService, Identity};
    use futures_util::{pin_mut, stream::StreamExt};
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn service(base_url: &str) -> DocumentService {
        DocumentService {
            client: reqwest::Client::builder()
                .user_agent("docingest-test")
                .build()
                .expect("client"),
            base_url: base_url.to_string(),
            identity: Identity {
                tenant_id: "tenant_123".into(),
                user_id: "user_456".into(),
                subscription_key: None,
            },
        }
    }

    fn record(id: &str, status: &str) -> serde_json::Value {
        json!({ "id": id, "status": status })
    }

    #[tokio::test]
    async fn stream_documents_collects_multiple_pages() {
        let server = MockServer::start_async().await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET).path("/documents").query_param("page", "1");
                then.status(200).json_body(json!({
                    "documents": [record("doc-1", "succeeded")],
                    "total": 2,
                    "page": 1,
                    "pageSize": 1,
                    "totalPages": 2
                }));
            })
            .await;

        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/documents").query_param("page", "2");
                then.status(200).json_body(json!({
                    "documents": [record("doc-2", "failed")],
                    "total": 2,
                    "page": 2,
                    "pageSize": 1,
                    "totalPages": 2
                }));
            })
            .await;

        let service = service(&server.base_url());
        let filters = DocumentFilters::default();
        let stream = stream_documents(&service, &filters);
        pin_mut!(stream);

        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item.expect("record").id);
        }

        first.assert();
        second.assert();
        assert_eq!(ids, vec!["doc-1".to_string(), "doc-2".to_string()]);
    }

    #[tokio::test]
    async fn stream_documents_stops_on_empty_listing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/documents");
                then.status(200).json_body(json!({
                    "documents": [],
                    "total": 0,
                    "page": 1,
                    "pageSize": 25,
                    "totalPages": 0
                }));
            })
            .await;

        let service = service(&server.base_url());
        let filters = DocumentFilters::default();
        let stream = stream_documents(&service, &filters);
        pin_mut!(stream);

        assert!(stream.next().await.is_none());
        mock.assert();
    }
}
