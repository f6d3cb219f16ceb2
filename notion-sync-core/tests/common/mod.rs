#![allow(dead_code)]
//! In-memory `DocumentStore` used by the integration tests.
//!
//! Tracks how many calls are in flight at once and keeps an ordered event log,
//! so tests can assert the concurrency cap and chunk ordering.

use async_trait::async_trait;
use notion_sync_core::contract::{
    DocumentStore, PropertyValue, RecordProperty, RemoteBlock, RemoteError, RemoteRecord,
};
use notion_sync_core::translate::ContentBlock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub database_id: String,
    pub properties: Vec<RecordProperty>,
    pub children: Vec<(String, ContentBlock)>,
}

impl StoredRecord {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn title(&self) -> Option<&str> {
        match self.property("Name") {
            Some(PropertyValue::Title(t)) => Some(t),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self.property("Path") {
            Some(PropertyValue::RichText(p)) => Some(p),
            _ => None,
        }
    }

    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.children.iter().map(|(_, b)| b.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Query(String),
    Create(String),
    Update(String),
    List(String),
    Delete(String),
    Append(String),
}

#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<StoredRecord>>,
    events: Mutex<Vec<Event>>,
    query_failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long, so concurrent calls overlap.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Seed a record with the given path and body.
    pub fn seed(&self, database_id: &str, path: &str, blocks: Vec<ContentBlock>) -> String {
        let id = self.next_id("page");
        let children = blocks
            .into_iter()
            .map(|b| (self.next_id("block"), b))
            .collect();
        self.records.lock().unwrap().push(StoredRecord {
            id: id.clone(),
            database_id: database_id.to_string(),
            properties: vec![
                RecordProperty::new("Name", PropertyValue::Title("seeded".into())),
                RecordProperty::new("Path", PropertyValue::RichText(path.into())),
            ],
            children,
        });
        id
    }

    /// Queries for `path` fail with these errors, in order, before succeeding.
    pub fn fail_queries(&self, path: &str, errors: Vec<RemoteError>) {
        self.query_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), errors.into());
    }

    pub fn record(&self, database_id: &str, path: &str) -> Option<StoredRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.database_id == database_id && r.path() == Some(path))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn query_count(&self, path: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Query(path.to_string()))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, event: Event) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(event);
        let guard = InFlight(&self.in_flight);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard
    }

    fn path_of_record(&self, record_id: &str) -> String {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == record_id)
            .and_then(|r| r.path().map(str::to_string))
            .unwrap_or_default()
    }
}

fn not_found(id: &str) -> RemoteError {
    RemoteError::other("object_not_found", format!("no object {id}"))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn query_by_path(
        &self,
        database_id: &str,
        path: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        let _guard = self.enter(Event::Query(path.to_string())).await;
        if let Some(err) = self
            .query_failures
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.database_id == database_id && r.path() == Some(path))
            .map(|r| RemoteRecord { id: r.id.clone() })
            .collect())
    }

    async fn create_record(
        &self,
        database_id: &str,
        properties: &[RecordProperty],
        blocks: &[ContentBlock],
    ) -> Result<RemoteRecord, RemoteError> {
        let path = properties
            .iter()
            .find_map(|p| match (&p.name[..], &p.value) {
                ("Path", PropertyValue::RichText(path)) => Some(path.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let _guard = self.enter(Event::Create(path)).await;
        let id = self.next_id("page");
        let children = blocks
            .iter()
            .map(|b| (self.next_id("block"), b.clone()))
            .collect();
        self.records.lock().unwrap().push(StoredRecord {
            id: id.clone(),
            database_id: database_id.to_string(),
            properties: properties.to_vec(),
            children,
        });
        Ok(RemoteRecord { id })
    }

    async fn update_record_properties(
        &self,
        record_id: &str,
        properties: &[RecordProperty],
    ) -> Result<(), RemoteError> {
        let _guard = self
            .enter(Event::Update(self.path_of_record(record_id)))
            .await;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| not_found(record_id))?;
        for property in properties {
            record.properties.retain(|p| p.name != property.name);
            record.properties.push(property.clone());
        }
        Ok(())
    }

    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<RemoteBlock>, RemoteError> {
        let _guard = self.enter(Event::List(self.path_of_record(record_id))).await;
        let records = self.records.lock().unwrap();
        let record = records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| not_found(record_id))?;
        Ok(record
            .children
            .iter()
            .map(|(id, _)| RemoteBlock { id: id.clone() })
            .collect())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), RemoteError> {
        let _guard = self.enter(Event::Delete(block_id.to_string())).await;
        let mut records = self.records.lock().unwrap();
        for record in records.iter_mut() {
            if let Some(pos) = record.children.iter().position(|(id, _)| id == block_id) {
                record.children.remove(pos);
                return Ok(());
            }
        }
        Err(not_found(block_id))
    }

    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), RemoteError> {
        let _guard = self
            .enter(Event::Append(self.path_of_record(record_id)))
            .await;
        let new_children: Vec<_> = blocks
            .iter()
            .map(|b| (self.next_id("block"), b.clone()))
            .collect();
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| not_found(record_id))?;
        record.children.extend(new_children);
        Ok(())
    }
}

/// Write `files` (relative path, contents) under a fresh temp directory.
pub fn workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, contents).unwrap();
    }
    dir
}
