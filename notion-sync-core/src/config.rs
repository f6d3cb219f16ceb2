//! Configuration resolver: turns an already-parsed (and env-expanded) YAML
//! value into document groups and global run settings.
//!
//! The resolver works on a generic [`serde_yaml::Value`] rather than a typed
//! struct so that a missing `document_groups` key, a non-mapping value and an
//! empty mapping each produce their own diagnostic.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}

/// Extra record property attached to every record of a group.
///
/// Closed over the property kinds the store supports; an unknown `type` in
/// the configuration is rejected at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtraProperty {
    /// A single named choice of a select property.
    Select { value: String },
}

/// A named set of local documents synced into one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentGroup {
    pub name: String,
    pub file_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub destination_id: String,
    pub extra_properties: BTreeMap<String, ExtraProperty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSettings {
    pub retry_attempts: u32,
    pub batch_size: usize,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Validated configuration, groups in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub groups: Vec<DocumentGroup>,
    pub global: GlobalSettings,
}

impl ResolvedConfig {
    pub fn trace_loaded(&self) {
        info!(
            groups = self.groups.len(),
            retry_attempts = self.global.retry_attempts,
            batch_size = self.global.batch_size,
            "Loaded configuration"
        );
        debug!(?self, "Configuration loaded (full debug)");
    }
}

#[derive(Debug, Deserialize)]
struct GroupSection {
    paths: Option<Vec<String>>,
    #[serde(default)]
    exclude: Vec<String>,
    notion_database_id: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, ExtraProperty>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalSection {
    retry_attempts: Option<u32>,
    batch_size: Option<usize>,
}

/// Validate and normalise a configuration value.
pub fn resolve(value: &Value) -> Result<ResolvedConfig, ConfigError> {
    let root = match value {
        Value::Mapping(map) => map,
        Value::Null => return Err(invalid("config is empty")),
        _ => return Err(invalid("config must be a mapping")),
    };

    let groups_value = root
        .get("document_groups")
        .ok_or_else(|| invalid("config must have a \"document_groups\" mapping"))?;
    let groups_map = groups_value
        .as_mapping()
        .ok_or_else(|| invalid("\"document_groups\" must be a mapping"))?;
    if groups_map.is_empty() {
        return Err(invalid("at least one document group must be defined"));
    }

    let shared_excludes: Vec<String> = match root.get("exclude") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => serde_yaml::from_value(v.clone())
            .map_err(|e| invalid(format!("\"exclude\" must be a list of patterns: {e}")))?,
    };

    let mut groups = Vec::with_capacity(groups_map.len());
    for (key, group_value) in groups_map {
        let name = key
            .as_str()
            .ok_or_else(|| invalid(format!("document group name {key:?} must be a string")))?
            .to_string();
        groups.push(resolve_group(name, group_value, &shared_excludes)?);
    }

    let global = match root.get("global") {
        None | Some(Value::Null) => GlobalSection::default(),
        Some(v) => serde_yaml::from_value(v.clone())
            .map_err(|e| invalid(format!("\"global\" section is malformed: {e}")))?,
    };

    Ok(ResolvedConfig {
        groups,
        global: GlobalSettings {
            retry_attempts: global
                .retry_attempts
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            batch_size: global
                .batch_size
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
        },
    })
}

fn resolve_group(
    name: String,
    value: &Value,
    shared_excludes: &[String],
) -> Result<DocumentGroup, ConfigError> {
    if !value.is_mapping() {
        return Err(invalid(format!(
            "document group \"{name}\" must be a mapping"
        )));
    }
    let section: GroupSection = serde_yaml::from_value(value.clone())
        .map_err(|e| invalid(format!("document group \"{name}\": {e}")))?;

    let file_patterns = section.paths.unwrap_or_default();
    if file_patterns.is_empty() {
        return Err(invalid(format!(
            "document group \"{name}\" must have a non-empty \"paths\" list"
        )));
    }

    let destination_id = section
        .notion_database_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            invalid(format!(
                "document group \"{name}\" must have \"notion_database_id\""
            ))
        })?;

    let exclude_patterns = shared_excludes
        .iter()
        .cloned()
        .chain(section.exclude)
        .collect();

    Ok(DocumentGroup {
        name,
        file_patterns,
        exclude_patterns,
        destination_id,
        extra_properties: section.properties,
    })
}
