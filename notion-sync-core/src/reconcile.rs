//! Record reconciler: brings one remote record in line with one local file.
//!
//! The decision is driven by the `Path` property: no record carrying the
//! file's path means create, otherwise the first match is updated in place.
//! An update rewrites the metadata and then replaces the whole body: every
//! existing child block is deleted before the new blocks are appended.
//!
//! There is no rollback. A failure after the metadata update leaves the record
//! with fresh properties and stale (or partially cleared) content; the state
//! reached is reported in [`SyncError::RemoteOperationFailed`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::ExtraProperty;
use crate::contract::{DocumentStore, PropertyValue, RecordProperty, RemoteError};
use crate::retry::Retryable;
use crate::translate::TranslatedDocument;

pub const TITLE_PROPERTY: &str = "Name";
pub const PATH_PROPERTY: &str = "Path";
pub const LAST_UPDATED_PROPERTY: &str = "Last Updated";

/// Where a reconciliation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Unresolved,
    NoMatch,
    Creating,
    Created,
    Matched,
    UpdatingMetadata,
    ClearingContent,
    AppendingContent,
    Updated,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReconcileState::Unresolved => "looking up record",
            ReconcileState::NoMatch => "no matching record",
            ReconcileState::Creating => "creating record",
            ReconcileState::Created => "created",
            ReconcileState::Matched => "matched record",
            ReconcileState::UpdatingMetadata => "updating metadata",
            ReconcileState::ClearingContent => "clearing content",
            ReconcileState::AppendingContent => "appending content",
            ReconcileState::Updated => "updated",
        };
        f.write_str(label)
    }
}

/// Successful end state of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Created { record_id: String },
    Updated { record_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read {file_path}: {source}")]
    ReadFailed {
        file_path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("remote operation failed for {file_path} while {state}: {cause}")]
    RemoteOperationFailed {
        file_path: String,
        state: ReconcileState,
        #[source]
        cause: RemoteError,
    },
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::ReadFailed { .. } => false,
            SyncError::RemoteOperationFailed { cause, .. } => cause.is_retryable(),
        }
    }
}

/// Property set written on both create and update.
pub fn build_properties(
    title: &str,
    file_path: &str,
    extra: &BTreeMap<String, ExtraProperty>,
    now: DateTime<Utc>,
) -> Vec<RecordProperty> {
    let mut properties = vec![
        RecordProperty::new(TITLE_PROPERTY, PropertyValue::Title(title.to_string())),
        RecordProperty::new(PATH_PROPERTY, PropertyValue::RichText(file_path.to_string())),
        RecordProperty::new(LAST_UPDATED_PROPERTY, PropertyValue::Date(now)),
    ];
    properties.extend(extra.iter().map(|(name, property)| match property {
        ExtraProperty::Select { value } => {
            RecordProperty::new(name.clone(), PropertyValue::Select(value.clone()))
        }
    }));
    properties
}

pub struct Reconciler<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create or update the record for `file_path` under `destination_id`.
    pub async fn reconcile(
        &self,
        file_path: &str,
        document: &TranslatedDocument,
        destination_id: &str,
        extra: &BTreeMap<String, ExtraProperty>,
    ) -> Result<Reconciled, SyncError> {
        let mut state = ReconcileState::Unresolved;
        let failed = |state: ReconcileState| {
            move |cause: RemoteError| SyncError::RemoteOperationFailed {
                file_path: file_path.to_string(),
                state,
                cause,
            }
        };

        let existing = self
            .store
            .query_by_path(destination_id, file_path)
            .await
            .map_err(failed(state))?;
        let properties = build_properties(&document.title, file_path, extra, Utc::now());

        let Some(record) = existing.into_iter().next() else {
            state = ReconcileState::NoMatch;
            debug!(file = file_path, %state, "No existing record");
            state = ReconcileState::Creating;
            let created = self
                .store
                .create_record(destination_id, &properties, &document.blocks)
                .await
                .map_err(failed(state))?;
            state = ReconcileState::Created;
            info!(file = file_path, record_id = %created.id, blocks = document.blocks.len(), %state, "Reconciled record");
            return Ok(Reconciled::Created {
                record_id: created.id,
            });
        };

        state = ReconcileState::Matched;
        debug!(file = file_path, record_id = %record.id, %state, "Found existing record");

        state = ReconcileState::UpdatingMetadata;
        self.store
            .update_record_properties(&record.id, &properties)
            .await
            .map_err(failed(state))?;

        state = ReconcileState::ClearingContent;
        let children = self
            .store
            .list_child_blocks(&record.id)
            .await
            .map_err(failed(state))?;
        // Sequential so a single file never holds more than one request in flight.
        for child in &children {
            self.store
                .delete_block(&child.id)
                .await
                .map_err(failed(state))?;
        }
        debug!(file = file_path, removed = children.len(), "Cleared existing content");

        state = ReconcileState::AppendingContent;
        self.store
            .append_child_blocks(&record.id, &document.blocks)
            .await
            .map_err(failed(state))?;

        state = ReconcileState::Updated;
        info!(file = file_path, record_id = %record.id, blocks = document.blocks.len(), %state, "Reconciled record");
        Ok(Reconciled::Updated {
            record_id: record.id,
        })
    }
}
