//! Parsed document model shared by every stage of the split.
//!
//! A `Document` is produced once by a [`crate::parser::DocumentParser`] and is
//! treated as read-only afterwards: extractors build new, cloned section trees
//! for the core output instead of mutating the parser's tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed markdown file with optional YAML frontmatter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Path relative to the source root, always `/`-separated.
    pub path: String,
    pub frontmatter: Option<Frontmatter>,
    pub sections: Vec<Section>,
    /// Original file content, kept for callers that need the bytes verbatim.
    #[serde(skip)]
    pub raw_content: String,
}

impl Document {
    /// Every section in the tree, parents before children.
    pub fn sections_preorder(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        for section in &self.sections {
            section.collect_preorder(&mut out);
        }
        out
    }

    /// Final path segment, e.g. `spec-workflow.md` for `rules/do/spec-workflow.md`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path.as_str())
    }

    /// Frontmatter `name`, or `""` when the document has none.
    pub fn name(&self) -> &str {
        self.frontmatter
            .as_ref()
            .map(|fm| fm.name.as_str())
            .unwrap_or("")
    }
}

/// A header-bounded block of a markdown document.
///
/// A section spans from its header line to the next header of equal or
/// shallower level. Level 0 is the preamble before the first header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    pub level: usize,
    /// Header text without the leading `#` markers.
    pub title: String,
    /// Full section text including the header line, excluding children.
    pub content: String,
    /// 1-based line of the header.
    pub start_line: usize,
    /// 1-based line where the section ends (exclusive).
    pub end_line: usize,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(level: usize, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_lines(mut self, start_line: usize, end_line: usize) -> Self {
        self.start_line = start_line;
        self.end_line = end_line;
        self
    }

    pub fn with_children(mut self, children: Vec<Section>) -> Self {
        self.children = children;
        self
    }

    fn collect_preorder<'a>(&'a self, out: &mut Vec<&'a Section>) {
        out.push(self);
        for child in &self.children {
            child.collect_preorder(out);
        }
    }
}

/// YAML frontmatter of an agent or skill file.
///
/// The well-known keys are lifted into typed fields; `raw` keeps every key
/// (including the typed ones) so nothing is lost on the way through.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub name: String,
    pub description: String,
    pub tools: String,
    pub model: String,
    pub permission_mode: String,
    pub memory: String,
    /// Skill names in declaration order. Duplicates are preserved.
    pub skills: Vec<String>,
    pub raw: BTreeMap<String, Value>,
}

impl Frontmatter {
    /// Builds typed fields from a decoded frontmatter map.
    pub fn from_raw(raw: BTreeMap<String, Value>) -> Self {
        let text = |key: &str| raw.get(key).map(value_to_text).unwrap_or_default();
        Self {
            name: text("name"),
            description: text("description"),
            tools: text("tools"),
            model: text("model"),
            permission_mode: text("permissionMode"),
            memory: text("memory"),
            skills: raw.get("skills").map(value_to_list).unwrap_or_default(),
            raw,
        }
    }
}

/// Scalars become their plain text; lists are joined with `, `.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Accepts either a YAML sequence or a comma-separated string.
fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
