#![doc = "notion-sync-core: reconciliation engine for notion-sync."]

//! This crate holds the document reconciliation and sync engine: everything
//! between an already-parsed configuration value and the remote store
//! capability. It performs no network I/O itself; the store is injected as a
//! [`contract::DocumentStore`] implementation.
//!
//! # Pipeline
//! [`config::resolve`] → [`materialize::materialize`] → per group,
//! [`synchronise::BatchScheduler`] → per file, [`translate::translate`] +
//! [`reconcile::Reconciler`] → [`synchronise::SyncReport`].
//!
//! # Usage
//! Depend on this crate from a binary that parses configuration and provides a
//! concrete store, then call [`synchronise::sync_all`].

pub mod config;
pub mod contract;
pub mod materialize;
pub mod reconcile;
pub mod retry;
pub mod synchronise;
pub mod translate;
