//! Group materializer: expands each group's glob patterns into a concrete,
//! sorted, de-duplicated list of files relative to a root directory.
//!
//! Paths are returned with `/` separators regardless of platform, since they
//! double as the remote `Path` key. `*` does not cross directory boundaries;
//! `**` does. A hidden file or directory (a component starting with `.`) is
//! only matched when a `.`-prefixed segment of the pattern accepts that very
//! component, so `.github/**/*.md` does not reach `.github/.cache/`.
//! Patterns that climb out of the root (`..`, absolute paths) are ignored with
//! a warning.

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Component, Path};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::DocumentGroup;

/// A group together with the files it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub group: DocumentGroup,
    pub files: Vec<String>,
}

/// Outcome of materializing every configured group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedGroups {
    pub groups: Vec<ResolvedGroup>,
    /// Names of groups that matched no files.
    pub skipped: Vec<String>,
}

/// Resolve every group's file list, dropping groups that matched nothing.
pub fn materialize(root: &Path, groups: &[DocumentGroup]) -> MaterializedGroups {
    let mut result = MaterializedGroups::default();
    for group in groups {
        let files = expand_patterns(root, &group.file_patterns, &group.exclude_patterns);
        if files.is_empty() {
            warn!(group = %group.name, "No files found for document group, skipping");
            result.skipped.push(group.name.clone());
            continue;
        }
        info!(group = %group.name, files = files.len(), "Resolved document group");
        result.groups.push(ResolvedGroup {
            group: group.clone(),
            files,
        });
    }
    result
}

/// Files under `root` matched by any of `patterns` and none of `exclude_patterns`.
///
/// An invalid pattern is logged and ignored rather than failing the group.
pub fn expand_patterns(root: &Path, patterns: &[String], exclude_patterns: &[String]) -> Vec<String> {
    let excludes = build_exclude_set(exclude_patterns);
    let mut files = BTreeSet::new();

    for raw in patterns {
        let pattern = normalise_pattern(raw);
        let matcher = match compile(pattern) {
            Ok(m) => m,
            Err(e) => {
                error!(pattern = %raw, error = %e, "Error matching pattern");
                continue;
            }
        };
        if escapes_root(pattern) {
            warn!(pattern = %raw, "Pattern reaches outside the root directory, ignoring");
            continue;
        }
        let hidden = HiddenSegments::from_pattern(pattern);
        let start = root.join(literal_prefix(pattern));
        if !start.exists() {
            debug!(pattern = %raw, start = %start.display(), "Pattern base does not exist");
            continue;
        }

        let walker = WalkDir::new(&start)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || hidden.allows(&entry.file_name().to_string_lossy()));
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_key(root, entry.path()) else {
                continue;
            };
            if !relative.split('/').all(|segment| hidden.allows(segment)) {
                continue;
            }
            if matcher.is_match(&relative) && !excludes.is_match(&relative) {
                files.insert(relative);
            }
        }
    }

    files.into_iter().collect()
}

fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

fn build_exclude_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for raw in patterns {
        let pattern = normalise_pattern(raw);
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => error!(pattern = %raw, error = %e, "Ignoring invalid exclude pattern"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        error!(error = %e, "Failed to build exclude set, excluding nothing");
        GlobSet::empty()
    })
}

fn normalise_pattern(pattern: &str) -> &str {
    let mut pattern = pattern.trim();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Leading directory segments without glob syntax; the walk starts there.
fn literal_prefix(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = segments
        .iter()
        .take_while(|segment| !has_glob_meta(segment))
        .copied()
        .collect();
    if literal.len() == segments.len() {
        // No glob syntax at all: the pattern names a single file.
        return pattern.to_string();
    }
    literal.join("/")
}

/// Pattern segments that name hidden entries (`.github`, `.*.md`). A hidden
/// path segment is only walked into or matched when one of these accepts it.
struct HiddenSegments {
    matchers: Vec<GlobMatcher>,
}

impl HiddenSegments {
    fn from_pattern(pattern: &str) -> Self {
        let matchers = pattern
            .split('/')
            .filter(|segment| segment.starts_with('.') && *segment != "." && *segment != "..")
            .filter_map(|segment| compile(segment).ok())
            .collect();
        Self { matchers }
    }

    fn allows(&self, segment: &str) -> bool {
        !segment.starts_with('.') || self.matchers.iter().any(|m| m.is_match(segment))
    }
}

fn escapes_root(pattern: &str) -> bool {
    Path::new(pattern)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
