//! Slot markers and the slot registry.
//!
//! A slot marks the place persona content was cut out of a core document.
//! Section slots replace a whole section body:
//!
//! ```text
//! <!-- BEGIN_SLOT:QUALITY_FRAMEWORK -->
//!
//! <!-- END_SLOT:QUALITY_FRAMEWORK -->
//! ```
//!
//! Inline slots replace a phrase: `{{slot:QUALITY_GATE_TEXT}}`.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;

pub const REGISTRY_VERSION: &str = "1.0.0";

static INLINE_SLOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{slot:([A-Z][A-Z0-9_]*)\}\}").unwrap());

static SECTION_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!-- BEGIN_SLOT:([A-Z][A-Z0-9_]*) -->").unwrap());

static SLOT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

/// Whether `slot_id` can be recovered from the marker text it is written into.
pub fn is_valid_slot_id(slot_id: &str) -> bool {
    SLOT_ID_RE.is_match(slot_id)
}

fn section_begin(slot_id: &str) -> String {
    format!("<!-- BEGIN_SLOT:{} -->", slot_id)
}

fn section_end(slot_id: &str) -> String {
    format!("<!-- END_SLOT:{} -->", slot_id)
}

/// Wraps `content` in begin/end markers for `slot_id`.
pub fn insert_section_slot(slot_id: &str, content: &str) -> String {
    format!("{}\n{}\n{}", section_begin(slot_id), content, section_end(slot_id))
}

pub fn insert_inline_slot(slot_id: &str) -> String {
    format!("{{{{slot:{}}}}}", slot_id)
}

/// Content between the markers for `slot_id`, without the newlines
/// [`insert_section_slot`] adds.
pub fn extract_section_slot<'a>(content: &'a str, slot_id: &str) -> Option<&'a str> {
    let begin = section_begin(slot_id);
    let end = section_end(slot_id);

    let after_begin = content.find(&begin)? + begin.len();
    let len = content[after_begin..].find(&end)?;
    let inner = &content[after_begin..after_begin + len];
    let inner = inner.strip_prefix('\n').unwrap_or(inner);
    Some(inner.strip_suffix('\n').unwrap_or(inner))
}

/// Section slot ids in order of appearance.
pub fn find_section_slots(content: &str) -> Vec<String> {
    SECTION_BEGIN_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Inline slot ids in order of appearance, repeats included.
pub fn find_inline_slots(content: &str) -> Vec<String> {
    INLINE_SLOT_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Every slot id referenced in `content`, sorted and deduplicated.
pub fn find_all_slot_markers(content: &str) -> Vec<String> {
    find_inline_slots(content)
        .into_iter()
        .chain(find_section_slots(content))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerType {
    Section,
    Inline,
}

/// Where a slot marker was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLocation {
    pub path: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original_header: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub occurrences: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub category: String,
    pub scope: String,
    pub description: String,
    pub marker_type: MarkerType,
    pub found_in: Vec<SlotLocation>,
    #[serde(default)]
    pub default: String,
}

/// Every slot id discovered in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRegistry {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub slots: BTreeMap<String, SlotEntry>,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION.to_string(),
            source: None,
            slots: BTreeMap::new(),
        }
    }
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry` under `slot_id` if the id is new and returns `true`.
    ///
    /// A known id keeps its original entry; only the new locations are
    /// appended to `found_in`.
    pub fn register(&mut self, slot_id: &str, entry: SlotEntry) -> bool {
        match self.slots.get_mut(slot_id) {
            Some(existing) => {
                existing.found_in.extend(entry.found_in);
                false
            }
            None => {
                self.slots.insert(slot_id.to_string(), entry);
                true
            }
        }
    }

    /// Registers every slot marker in `doc`'s section tree.
    ///
    /// Returns the ids that were new to the registry, in discovery order.
    pub fn register_document(&mut self, doc: &Document, scope: &str) -> Vec<String> {
        let mut added = Vec::new();
        for section in doc.sections_preorder() {
            for slot_id in find_section_slots(&section.content) {
                let entry = SlotEntry {
                    category: "section".to_string(),
                    scope: scope.to_string(),
                    description: format!("Slot from section '{}'", section.title),
                    marker_type: MarkerType::Section,
                    found_in: vec![SlotLocation {
                        path: doc.path.clone(),
                        line: section.start_line,
                        original_header: section.title.clone(),
                        occurrences: 0,
                    }],
                    default: String::new(),
                };
                if self.register(&slot_id, entry) {
                    added.push(slot_id);
                }
            }

            let mut inline: BTreeMap<String, usize> = BTreeMap::new();
            for slot_id in find_inline_slots(&section.content) {
                *inline.entry(slot_id).or_default() += 1;
            }
            for (slot_id, occurrences) in inline {
                let entry = SlotEntry {
                    category: "content".to_string(),
                    scope: scope.to_string(),
                    description: format!("Inline slot in section '{}'", section.title),
                    marker_type: MarkerType::Inline,
                    found_in: vec![SlotLocation {
                        path: doc.path.clone(),
                        line: section.start_line,
                        original_header: section.title.clone(),
                        occurrences,
                    }],
                    default: String::new(),
                };
                if self.register(&slot_id, entry) {
                    added.push(slot_id);
                }
            }
        }

        if !added.is_empty() {
            debug!(path = %doc.path, slots = ?added, "registered slots");
        }
        added
    }

    pub fn get(&self, slot_id: &str) -> Option<&SlotEntry> {
        self.slots.get(slot_id)
    }

    pub fn contains(&self, slot_id: &str) -> bool {
        self.slots.contains_key(slot_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    #[test]
    fn test_slot_id_alphabet() {
        assert!(is_valid_slot_id("QUALITY_FRAMEWORK"));
        assert!(is_valid_slot_id("S1"));
        assert!(!is_valid_slot_id("quality-gates"));
        assert!(!is_valid_slot_id("1ST"));
        assert!(!is_valid_slot_id(""));
        assert!(!is_valid_slot_id("A}}B"));
    }

    #[test]
    fn test_insert_section_slot_empty() {
        assert_eq!(
            insert_section_slot("QUALITY_FRAMEWORK", ""),
            "<!-- BEGIN_SLOT:QUALITY_FRAMEWORK -->\n\n<!-- END_SLOT:QUALITY_FRAMEWORK -->"
        );
    }

    #[test]
    fn test_insert_inline_slot() {
        assert_eq!(insert_inline_slot("BRAND"), "{{slot:BRAND}}");
    }

    #[test]
    fn test_extract_section_slot() {
        let wrapped = insert_section_slot("TAG", "line one\nline two");
        let text = format!("before\n{}\nafter", wrapped);
        assert_eq!(extract_section_slot(&text, "TAG"), Some("line one\nline two"));
        assert_eq!(extract_section_slot(&text, "OTHER"), None);
        assert_eq!(extract_section_slot("<!-- BEGIN_SLOT:TAG -->", "TAG"), None);
    }

    #[test]
    fn test_find_all_slot_markers_sorted_and_deduplicated() {
        let text = "{{slot:ZED}} and {{slot:ALPHA}}\n\
                    <!-- BEGIN_SLOT:MID -->\n<!-- END_SLOT:MID -->\n{{slot:ZED}}";
        assert_eq!(find_all_slot_markers(text), vec!["ALPHA", "MID", "ZED"]);
    }

    #[test]
    fn test_lowercase_ids_are_not_markers() {
        assert!(find_all_slot_markers("{{slot:lower}} <!-- BEGIN_SLOT:x -->").is_empty());
    }

    fn doc(path: &str, sections: Vec<Section>) -> Document {
        Document {
            path: path.to_string(),
            sections,
            ..Document::default()
        }
    }

    #[test]
    fn test_register_document_section_slot() {
        let mut reg = SlotRegistry::new();
        let d = doc(
            "agents/expert.md",
            vec![Section::new(2, "Guidelines", "## Guidelines").with_children(vec![
                Section::new(3, "TRUST 5 Compliance", insert_section_slot("QUALITY_FRAMEWORK", ""))
                    .with_lines(12, 20),
            ])],
        );
        let added = reg.register_document(&d, "agent");
        assert_eq!(added, vec!["QUALITY_FRAMEWORK"]);

        let entry = reg.get("QUALITY_FRAMEWORK").unwrap();
        assert_eq!(entry.marker_type, MarkerType::Section);
        assert_eq!(entry.found_in.len(), 1);
        assert_eq!(entry.found_in[0].path, "agents/expert.md");
        assert_eq!(entry.found_in[0].line, 12);
        assert_eq!(entry.found_in[0].original_header, "TRUST 5 Compliance");
    }

    #[test]
    fn test_register_document_inline_counts_occurrences() {
        let mut reg = SlotRegistry::new();
        let d = doc(
            "rules/quality.md",
            vec![Section::new(1, "Q", "# Q\n{{slot:GATE}} then {{slot:GATE}}").with_lines(1, 3)],
        );
        reg.register_document(&d, "rule");
        let entry = reg.get("GATE").unwrap();
        assert_eq!(entry.marker_type, MarkerType::Inline);
        assert_eq!(entry.found_in[0].occurrences, 2);
    }

    #[test]
    fn test_rediscovery_keeps_first_entry_and_appends_location() {
        let mut reg = SlotRegistry::new();
        let marker = insert_section_slot("S1", "");
        reg.register_document(
            &doc("agents/a.md", vec![Section::new(2, "First", marker.clone())]),
            "agent",
        );
        let added = reg.register_document(
            &doc("agents/b.md", vec![Section::new(2, "Second", marker)]),
            "agent",
        );
        assert!(added.is_empty());
        assert_eq!(reg.len(), 1);

        let entry = reg.get("S1").unwrap();
        assert!(entry.description.contains("First"));
        let paths: Vec<&str> = entry.found_in.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["agents/a.md", "agents/b.md"]);
    }

    #[test]
    fn test_registry_serializes_marker_type_lowercase() {
        let mut reg = SlotRegistry::new();
        reg.register_document(
            &doc("agents/a.md", vec![Section::new(2, "T", insert_section_slot("S1", ""))]),
            "agent",
        );
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["slots"]["S1"]["marker_type"], "section");
        assert!(json.get("source").is_none());
    }
}
