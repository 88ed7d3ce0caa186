#![deny(missing_docs)]

//! Core library for the Docingest document-ingestion client.

/// Remote document-service boundary: HTTP client, wire types, filters.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Deduplicated document-list query sessions.
pub mod listing;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Upload queue manager and file validation.
pub mod queue;
/// Status polling and the shared document store.
pub mod tracking;
