//! Markdown → content block translation.
//!
//! Only the subset the remote store mirrors is recognised: `#`, `##` and `###`
//! headings and plain paragraph lines. Everything else is carried through as
//! paragraph text, so translation never fails.

use serde::Serialize;
use std::path::Path;

/// One structured unit of a record body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading1(String),
    Heading2(String),
    Heading3(String),
    Paragraph(String),
}

impl ContentBlock {
    /// Inline text carried by the block.
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Heading1(text)
            | ContentBlock::Heading2(text)
            | ContentBlock::Heading3(text)
            | ContentBlock::Paragraph(text) => text,
        }
    }
}

/// Title plus body of a translated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedDocument {
    pub title: String,
    pub blocks: Vec<ContentBlock>,
}

/// Translate a document's raw text. `file_path` is only consulted for the
/// fallback title when the text has no top-level heading.
pub fn translate(file_path: &Path, text: &str) -> TranslatedDocument {
    TranslatedDocument {
        title: extract_title(file_path, text),
        blocks: to_blocks(text),
    }
}

/// The first `# ` line with its marker stripped, else the file stem.
pub fn extract_title(file_path: &Path, text: &str) -> String {
    text.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::to_string)
        .unwrap_or_else(|| {
            file_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_path.display().to_string())
        })
}

/// Convert each line into at most one block; blank lines are dropped.
pub fn to_blocks(text: &str) -> Vec<ContentBlock> {
    text.lines().filter_map(line_to_block).collect()
}

fn line_to_block(line: &str) -> Option<ContentBlock> {
    if let Some(rest) = line.strip_prefix("### ") {
        Some(ContentBlock::Heading3(rest.to_string()))
    } else if let Some(rest) = line.strip_prefix("## ") {
        Some(ContentBlock::Heading2(rest.to_string()))
    } else if let Some(rest) = line.strip_prefix("# ") {
        Some(ContentBlock::Heading1(rest.to_string()))
    } else if !line.trim().is_empty() {
        Some(ContentBlock::Paragraph(line.to_string()))
    } else {
        None
    }
}
