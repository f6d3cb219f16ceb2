//! `load_config` module: Loads a YAML config file, injects environment values, and resolves it
//! into the engine's strongly-typed [`ResolvedConfig`].
//!
//! This module is the only place where untrusted YAML is read from disk.
//!
//! # Responsibilities
//! - Read and parse the YAML file into a generic value
//! - Replace `${VAR_NAME}` placeholders in every string with the environment value
//! - Fill in `notion_database_id` from `NOTION_DATABASE_ID` for groups that omit it
//! - Hand the result to [`notion_sync_core::config::resolve`] for validation
//!
//! # Errors
//! All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at
//! the CLI boundary.

use anyhow::{Context, Result};
use notion_sync_core::config::{resolve, ResolvedConfig};
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = ".github/notion-sync-config.yml";
pub const DEFAULT_DATABASE_ENV: &str = "NOTION_DATABASE_ID";

/// Loads, expands and validates the config file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ResolvedConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    if !path_ref.exists() {
        error!(config_path = ?path_ref, "Config file not found");
        return Err(anyhow::anyhow!("Config file not found: {}", path_ref.display()));
    }

    let config_content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;

    let raw: Value = match serde_yaml::from_str(&config_content) {
        Ok(value) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            value
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut expanded = expand_environment_variables(raw);
    if let Ok(default_database) = std::env::var(DEFAULT_DATABASE_ENV) {
        inject_default_database(&mut expanded, &default_database);
    }

    let config = resolve(&expanded).map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Configuration rejected");
        anyhow::Error::new(e)
    })?;
    config.trace_loaded();
    Ok(config)
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex is valid"))
}

/// Replace `${VAR}` in every string scalar. Unset variables are left as-is.
pub fn expand_environment_variables(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(expand_str(&s)),
        Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(expand_environment_variables).collect())
        }
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, expand_environment_variables(v)))
                .collect(),
        ),
        Value::Tagged(mut tagged) => {
            let inner = std::mem::take(&mut tagged.value);
            tagged.value = expand_environment_variables(inner);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn expand_str(input: &str) -> String {
    placeholder()
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    warn!(variable = name, "Environment variable is not set");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Give every group without a destination (absent or left empty) the default database id.
fn inject_default_database(config: &mut Value, default_database: &str) {
    let Some(groups) = config
        .get_mut("document_groups")
        .and_then(Value::as_mapping_mut)
    else {
        return;
    };
    for (name, group) in groups.iter_mut() {
        let Some(group) = group.as_mapping_mut() else {
            continue;
        };
        if matches!(group.get("notion_database_id"), None | Some(Value::Null)) {
            info!(group = ?name, "Using default database from environment");
            group.insert(
                Value::String("notion_database_id".into()),
                Value::String(default_database.to_string()),
            );
        }
    }
}
