//! Declarative filter set for the document listing endpoint.

use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Confidence sentinel meaning "no lower bound".
pub const CONFIDENCE_MIN_DEFAULT: f64 = 0.0;
/// Confidence sentinel meaning "no upper bound".
pub const CONFIDENCE_MAX_DEFAULT: f64 = 100.0;

/// Sort direction accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Filters applied to a document list request.
///
/// Fields left unset, empty after trimming, or at their default sentinel
/// (`confidence_min = 0`, `confidence_max = 100`) are omitted from the
/// outgoing request entirely rather than sent as no-op values.
#[derive(Debug, Clone)]
pub struct DocumentFilters {
    /// Free-text query over filename and tags.
    pub q: Option<String>,
    /// Exact tag match.
    pub tag: Option<String>,
    /// MIME content type match.
    pub content_type: Option<String>,
    /// Remote status match (service vocabulary, passed through verbatim).
    pub status: Option<String>,
    /// Shipment identifier match.
    pub shipment_id: Option<String>,
    /// Dangerous-goods flag match.
    pub is_dangerous_goods: Option<bool>,
    /// Lower confidence bound in percent.
    pub confidence_min: f64,
    /// Upper confidence bound in percent.
    pub confidence_max: f64,
    /// Transport type match.
    pub transport_type: Option<String>,
    /// Branch match.
    pub branch: Option<String>,
    /// Inclusive lower bound on creation time.
    pub from: Option<OffsetDateTime>,
    /// Inclusive upper bound on creation time.
    pub to: Option<OffsetDateTime>,
    /// Page number (1-based).
    pub page: Option<u32>,
    /// Page size.
    pub page_size: Option<u32>,
    /// Field to sort by.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub sort_dir: Option<SortDirection>,
}

impl Default for DocumentFilters {
    fn default() -> Self {
        Self {
            q: None,
            tag: None,
            content_type: None,
            status: None,
            shipment_id: None,
            is_dangerous_goods: None,
            confidence_min: CONFIDENCE_MIN_DEFAULT,
            confidence_max: CONFIDENCE_MAX_DEFAULT,
            transport_type: None,
            branch: None,
            from: None,
            to: None,
            page: None,
            page_size: None,
            sort_by: None,
            sort_dir: None,
        }
    }
}

impl DocumentFilters {
    /// Render the filter set as query pairs, omitting every unset or
    /// default-sentinel field.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        push_text(&mut pairs, "q", self.q.as_deref());
        push_text(&mut pairs, "tag", self.tag.as_deref());
        push_text(&mut pairs, "contentType", self.content_type.as_deref());
        push_text(&mut pairs, "status", self.status.as_deref());
        push_text(&mut pairs, "shipmentId", self.shipment_id.as_deref());

        if let Some(flag) = self.is_dangerous_goods {
            pairs.push(("isDangerousGoods", flag.to_string()));
        }
        if self.confidence_min > CONFIDENCE_MIN_DEFAULT {
            pairs.push(("confidenceMin", format_confidence(self.confidence_min)));
        }
        if self.confidence_max < CONFIDENCE_MAX_DEFAULT {
            pairs.push(("confidenceMax", format_confidence(self.confidence_max)));
        }

        push_text(&mut pairs, "transportType", self.transport_type.as_deref());
        push_text(&mut pairs, "branch", self.branch.as_deref());

        if let Some(from) = self.from.as_ref().and_then(format_timestamp) {
            pairs.push(("from", from));
        }
        if let Some(to) = self.to.as_ref().and_then(format_timestamp) {
            pairs.push(("to", to));
        }

        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pageSize", page_size.to_string()));
        }

        push_text(&mut pairs, "sortBy", self.sort_by.as_deref());
        if let Some(dir) = self.sort_dir {
            pairs.push(("sortDir", dir.to_string()));
        }

        pairs
    }
}

fn push_text(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            pairs.push((key, trimmed.to_string()));
        }
    }
}

fn format_confidence(value: f64) -> String {
    format!("{value}")
}

fn format_timestamp(value: &OffsetDateTime) -> Option<String> {
    value.format(&Rfc3339).ok()
}
