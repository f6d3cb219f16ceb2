#![doc = "Notion integration for the CLI: implements the core `DocumentStore` capability over the Notion REST API."]
//
//! # Notion Store (CLI <-> Core)
//!
//! This module wires the [`DocumentStore`] trait from `notion-sync-core` to the Notion API.
//! Authentication, request transport, pagination and Notion's per-request limits are handled
//! here so the engine only deals with records and blocks.
//!
//! ## Client Usage
//!
//! - Construct [`NotionClient`] with [`NotionClient::new_from_env`] (`NOTION_API_KEY`), or
//!   [`NotionClient::new`] with an explicit base URL (tests point it at a mock server).
//! - Every failed call is mapped to a classified [`RemoteError`] so the engine can decide
//!   whether to retry.

use async_trait::async_trait;
use notion_sync_core::contract::{
    DocumentStore, PropertyValue, RecordProperty, RemoteBlock, RemoteError, RemoteRecord,
};
use notion_sync_core::reconcile::PATH_PROPERTY;
use notion_sync_core::translate::ContentBlock;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::env;
use std::time::Duration;

pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const API_KEY_ENV: &str = "NOTION_API_KEY";

/// Notion accepts at most this many children per create/append request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;
/// Notion rejects text objects longer than this many characters.
pub const MAX_TEXT_LENGTH: usize = 2000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NotionClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn new_from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        match env::var(API_KEY_ENV) {
            Ok(api_key) if !api_key.trim().is_empty() => {
                tracing::info!(api_key_set = true, "Initialized NotionClient from environment");
                Self::new(api_key, NOTION_API_URL)
            }
            _ => {
                tracing::error!("{API_KEY_ENV} missing in environment");
                Err(anyhow::anyhow!("{API_KEY_ENV} must be set to sync with Notion"))
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, request: RequestBuilder, operation: &'static str) -> Result<Value, RemoteError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Request to Notion failed");
            transport_error(e)
        })?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| RemoteError::other("invalid_response", e.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        let err = classify_response(status, &body);
        tracing::error!(operation, status = status.as_u16(), code = %err.code, "Notion API error");
        Err(err)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::timeout(e.to_string())
    } else {
        RemoteError::other("request_failed", e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Map a non-success response to a classified error. The body's `code` wins
/// over the status; 429 and 503 are classified even without a body.
pub fn classify_response(status: StatusCode, body: &str) -> RemoteError {
    let parsed: Option<NotionErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));
    match parsed.and_then(|b| b.code) {
        Some(code) => RemoteError::from_code(code, message),
        None => match status {
            StatusCode::TOO_MANY_REQUESTS => RemoteError::rate_limited(message),
            StatusCode::SERVICE_UNAVAILABLE => RemoteError::service_unavailable(message),
            StatusCode::GATEWAY_TIMEOUT => RemoteError::timeout(message),
            _ => RemoteError::other(format!("http_{}", status.as_u16()), message),
        },
    }
}

/// Notion rich text array, split into objects of at most [`MAX_TEXT_LENGTH`] characters.
pub fn rich_text(content: &str) -> Value {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return json!([{ "type": "text", "text": { "content": "" } }]);
    }
    Value::Array(
        chars
            .chunks(MAX_TEXT_LENGTH)
            .map(|chunk| {
                let text: String = chunk.iter().collect();
                json!({ "type": "text", "text": { "content": text } })
            })
            .collect(),
    )
}

pub fn block_json(block: &ContentBlock) -> Value {
    let kind = match block {
        ContentBlock::Heading1(_) => "heading_1",
        ContentBlock::Heading2(_) => "heading_2",
        ContentBlock::Heading3(_) => "heading_3",
        ContentBlock::Paragraph(_) => "paragraph",
    };
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": rich_text(block.text()) }
    })
}

pub fn properties_json(properties: &[RecordProperty]) -> Value {
    let mut map = Map::new();
    for property in properties {
        let value = match &property.value {
            PropertyValue::Title(text) => json!({ "title": rich_text(text) }),
            PropertyValue::RichText(text) => json!({ "rich_text": rich_text(text) }),
            PropertyValue::Date(at) => json!({ "date": { "start": at.to_rfc3339() } }),
            PropertyValue::Select(name) => json!({ "select": { "name": name } }),
        };
        map.insert(property.name.clone(), value);
    }
    Value::Object(map)
}

fn blocks_json(blocks: &[ContentBlock]) -> Vec<Value> {
    blocks.iter().map(block_json).collect()
}

fn object_id(value: &Value) -> Result<String, RemoteError> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RemoteError::other("invalid_response", "response object has no id"))
}

fn result_ids(body: &Value) -> Result<Vec<String>, RemoteError> {
    body.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::other("invalid_response", "response has no results"))?
        .iter()
        .map(object_id)
        .collect()
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn query_by_path(
        &self,
        database_id: &str,
        path: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        tracing::debug!(database_id, path, "Querying database for existing page");
        let body = json!({
            "filter": {
                "property": PATH_PROPERTY,
                "rich_text": { "equals": path }
            }
        });
        let response = self
            .send(
                self.request(Method::POST, &format!("/v1/databases/{database_id}/query"))
                    .json(&body),
                "query_database",
            )
            .await?;
        Ok(result_ids(&response)?
            .into_iter()
            .map(|id| RemoteRecord { id })
            .collect())
    }

    async fn create_record(
        &self,
        database_id: &str,
        properties: &[RecordProperty],
        blocks: &[ContentBlock],
    ) -> Result<RemoteRecord, RemoteError> {
        let split = blocks.len().min(MAX_BLOCKS_PER_REQUEST);
        let (initial, rest) = blocks.split_at(split);
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties_json(properties),
            "children": blocks_json(initial),
        });
        let response = self
            .send(self.request(Method::POST, "/v1/pages").json(&body), "create_page")
            .await?;
        let record = RemoteRecord {
            id: object_id(&response)?,
        };
        tracing::info!(page_id = %record.id, database_id, "Created Notion page");
        if !rest.is_empty() {
            self.append_child_blocks(&record.id, rest).await?;
        }
        Ok(record)
    }

    async fn update_record_properties(
        &self,
        record_id: &str,
        properties: &[RecordProperty],
    ) -> Result<(), RemoteError> {
        let body = json!({ "properties": properties_json(properties) });
        self.send(
            self.request(Method::PATCH, &format!("/v1/pages/{record_id}"))
                .json(&body),
            "update_page",
        )
        .await?;
        tracing::info!(page_id = record_id, "Updated Notion page properties");
        Ok(())
    }

    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<RemoteBlock>, RemoteError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, &format!("/v1/blocks/{record_id}/children"))
                .query(&[("page_size", MAX_BLOCKS_PER_REQUEST.to_string())]);
            if let Some(start) = &cursor {
                request = request.query(&[("start_cursor", start)]);
            }
            let response = self.send(request, "list_block_children").await?;
            blocks.extend(result_ids(&response)?.into_iter().map(|id| RemoteBlock { id }));

            let has_more = response
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = response
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }
        tracing::debug!(page_id = record_id, count = blocks.len(), "Listed page children");
        Ok(blocks)
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), RemoteError> {
        self.send(
            self.request(Method::DELETE, &format!("/v1/blocks/{block_id}")),
            "delete_block",
        )
        .await?;
        Ok(())
    }

    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), RemoteError> {
        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let body = json!({ "children": blocks_json(chunk) });
            self.send(
                self.request(Method::PATCH, &format!("/v1/blocks/{record_id}/children"))
                    .json(&body),
                "append_block_children",
            )
            .await?;
        }
        tracing::info!(page_id = record_id, blocks = blocks.len(), "Appended page content");
        Ok(())
    }
}
