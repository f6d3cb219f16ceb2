//! High-level pipeline: materialize groups → translate files → reconcile records.
//!
//! This module provides the top-level orchestration for "synchronising" every
//! configured document group into its destination:
//!   - Resolves each group's patterns into files (see [`crate::materialize`])
//!   - Walks groups sequentially in configuration order
//!   - Splits each group's files into chunks of `batch_size` and reconciles a
//!     chunk concurrently, waiting for the whole chunk to settle before the
//!     next one starts
//!   - Wraps each file's reconciliation in the retry policy
//!   - Aggregates every per-file outcome into a [`SyncReport`]
//!
//! # Error Handling
//! Per-file failures never escape: they become `Errored` outcomes and the run
//! continues. The scheduler itself cannot fail.
//!
//! # Navigation
//! - Main entrypoint: [`sync_all`]
//! - Scheduler: [`BatchScheduler`]
//! - Supporting types: [`SyncOutcome`], [`SyncSummary`], [`SyncReport`]

use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, Instrument};

use crate::config::{GlobalSettings, ResolvedConfig};
use crate::contract::DocumentStore;
use crate::materialize::{materialize, ResolvedGroup};
use crate::reconcile::{Reconciled, Reconciler, SyncError};
use crate::retry::RetryPolicy;
use crate::translate::translate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Created,
    Updated,
    Errored,
}

/// Terminal result for one file in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub group: String,
    pub file_path: String,
    pub status: OutcomeStatus,
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total_files: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &SyncOutcome) {
        self.total_files += 1;
        match outcome.status {
            OutcomeStatus::Created => self.created += 1,
            OutcomeStatus::Updated => self.updated += 1,
            OutcomeStatus::Errored => self.errors += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

/// Everything a run produced: counts, per-file outcomes and skipped groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub outcomes: Vec<SyncOutcome>,
    pub skipped_groups: Vec<String>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Errored)
    }
}

/// Drives the reconciler over resolved groups under a concurrency cap.
pub struct BatchScheduler<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    root: PathBuf,
    retry: RetryPolicy,
    batch_size: usize,
}

impl<'a, S: DocumentStore + ?Sized> BatchScheduler<'a, S> {
    /// `root` is the directory group file paths are relative to.
    pub fn new(store: &'a S, root: impl Into<PathBuf>, settings: GlobalSettings) -> Self {
        Self {
            store,
            root: root.into(),
            retry: RetryPolicy::new(settings.retry_attempts),
            batch_size: settings.batch_size.max(1),
        }
    }

    pub async fn run(&self, groups: &[ResolvedGroup]) -> SyncReport {
        let mut report = SyncReport::default();

        for resolved in groups {
            let group = &resolved.group;
            let span = info_span!("group", name = %group.name, destination = %group.destination_id);
            async {
                info!(files = resolved.files.len(), "Processing group");
                for chunk in resolved.files.chunks(self.batch_size) {
                    let outcomes = join_all(chunk.iter().map(|file| self.sync_file(resolved, file))).await;
                    for outcome in outcomes {
                        report.summary.record(&outcome);
                        report.outcomes.push(outcome);
                    }
                }
            }
            .instrument(span)
            .await;
        }

        info!(
            total_files = report.summary.total_files,
            created = report.summary.created,
            updated = report.summary.updated,
            errors = report.summary.errors,
            "Sync finished"
        );
        report
    }

    async fn sync_file(&self, resolved: &ResolvedGroup, file_path: &str) -> SyncOutcome {
        let group = &resolved.group;
        let result = match self.read(file_path) {
            Ok(text) => {
                let document = translate(Path::new(file_path), &text);
                let reconciler = Reconciler::new(self.store);
                self.retry
                    .run(file_path, |_| {
                        reconciler.reconcile(
                            file_path,
                            &document,
                            &group.destination_id,
                            &group.extra_properties,
                        )
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        let (status, error_detail) = match result {
            Ok(Reconciled::Created { .. }) => (OutcomeStatus::Created, None),
            Ok(Reconciled::Updated { .. }) => (OutcomeStatus::Updated, None),
            Err(e) => {
                error!(file = file_path, error = %e, "Error syncing file");
                (OutcomeStatus::Errored, Some(e.to_string()))
            }
        };
        SyncOutcome {
            group: group.name.clone(),
            file_path: file_path.to_string(),
            status,
            error_detail,
        }
    }

    fn read(&self, file_path: &str) -> Result<String, SyncError> {
        std::fs::read_to_string(self.root.join(file_path)).map_err(|source| SyncError::ReadFailed {
            file_path: file_path.to_string(),
            source,
        })
    }
}

/// Run-level entry point: materialize every configured group under `root` and
/// synchronise the non-empty ones into `store`.
pub async fn sync_all<S>(config: &ResolvedConfig, root: &Path, store: &S) -> SyncReport
where
    S: DocumentStore + ?Sized,
{
    info!(
        root = %root.display(),
        retry_attempts = config.global.retry_attempts,
        batch_size = config.global.batch_size,
        "[SYNC] Starting synchronisation"
    );
    let materialized = materialize(root, &config.groups);
    if materialized.groups.is_empty() {
        info!("[SYNC] No files found to sync");
    }
    let mut report = BatchScheduler::new(store, root, config.global)
        .run(&materialized.groups)
        .await;
    report.skipped_groups = materialized.skipped;
    report
}
