//! # contract: the remote document store capability
//!
//! This module defines the single trait ([`DocumentStore`]) the engine uses to
//! read and mutate records in a remote hierarchical document store, plus the
//! plain data types passed across it.
//!
//! ## Interface & Extensibility
//! - Implement [`DocumentStore`] for a concrete backend (the CLI crate ships a
//!   Notion client). Authentication, transport and pagination stay inside the
//!   implementor.
//! - Every method returns a [`RemoteError`] classified by [`RemoteErrorKind`],
//!   which the retry layer uses to decide whether an attempt is repeated.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so `MockDocumentStore` is available
//!   in tests (and to downstream crates with the `test-export-mocks` feature).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::translate::ContentBlock;

/// A record as returned by the store. Only its identity is needed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: String,
}

/// A child block of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlock {
    pub id: String,
}

/// Typed value of a single record property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Date(DateTime<Utc>),
    Select(String),
}

/// A named property as sent on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl RecordProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Failure class of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    RateLimited,
    ServiceUnavailable,
    Timeout,
    Other,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::ServiceUnavailable => "service unavailable",
            RemoteErrorKind::Timeout => "timed out",
            RemoteErrorKind::Other => "failed",
        };
        f.write_str(label)
    }
}

/// Error returned by every [`DocumentStore`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote store {kind} [{code}]: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// Machine-readable code as reported by the store (e.g. `rate_limited`).
    pub code: String,
    pub message: String,
}

impl RemoteError {
    /// Classify an error from the store's machine-readable code.
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let kind = match code.as_str() {
            "rate_limited" => RemoteErrorKind::RateLimited,
            "service_unavailable" => RemoteErrorKind::ServiceUnavailable,
            "timeout" | "ETIMEDOUT" => RemoteErrorKind::Timeout,
            _ => RemoteErrorKind::Other,
        };
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::from_code("rate_limited", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::from_code("service_unavailable", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::from_code("timeout", message)
    }

    /// An unclassified failure. `code` is kept for diagnostics.
    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Other,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Rate limits, unavailability and timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, RemoteErrorKind::Other)
    }
}

/// Capability set of the remote document store.
///
/// Records live under a destination (a database). Each synced record carries a
/// `Path` property holding the local file path; at most one record per
/// destination is expected to carry a given path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Records under `database_id` whose `Path` property equals `path` exactly.
    async fn query_by_path(
        &self,
        database_id: &str,
        path: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Create a record under `database_id` with initial body `blocks`.
    async fn create_record(
        &self,
        database_id: &str,
        properties: &[RecordProperty],
        blocks: &[ContentBlock],
    ) -> Result<RemoteRecord, RemoteError>;

    /// Replace the listed properties on an existing record.
    async fn update_record_properties(
        &self,
        record_id: &str,
        properties: &[RecordProperty],
    ) -> Result<(), RemoteError>;

    /// All direct children of a record, in order.
    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<RemoteBlock>, RemoteError>;

    async fn delete_block(&self, block_id: &str) -> Result<(), RemoteError>;

    /// Append `blocks` after the record's current children.
    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), RemoteError>;
}
