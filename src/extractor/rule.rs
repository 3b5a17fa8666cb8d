use std::sync::Arc;

use tracing::debug;

use super::whole_file::record_persona_path;
use super::{DocumentKind, Extraction, Extractor};
use crate::document::{Document, Section};
use crate::error::Result;
use crate::manifest::PersonaManifest;
use crate::rules::RuleRegistry;
use crate::slots::insert_inline_slot;

/// Rule files: whole-file by filename, otherwise inline content slots.
#[derive(Debug, Clone)]
pub struct RuleExtractor {
    rules: Arc<RuleRegistry>,
}

#[derive(Debug)]
struct PhraseMatch<'a> {
    start: usize,
    end: usize,
    slot_id: &'a str,
}

impl RuleExtractor {
    pub fn new(rules: Arc<RuleRegistry>) -> Self {
        Self { rules }
    }

    /// Non-overlapping content pattern matches in `content`, by start offset.
    /// Where matches overlap the earliest start wins, then rule order.
    fn phrase_matches(&self, content: &str) -> Vec<PhraseMatch<'_>> {
        let mut all: Vec<(usize, PhraseMatch<'_>)> = Vec::new();
        for (order, (pattern, re)) in self.rules.content_patterns().enumerate() {
            for m in re.find_iter(content) {
                if m.is_empty() {
                    continue;
                }
                all.push((
                    order,
                    PhraseMatch {
                        start: m.start(),
                        end: m.end(),
                        slot_id: &pattern.slot_id,
                    },
                ));
            }
        }
        all.sort_by_key(|(order, m)| (m.start, *order));

        let mut kept: Vec<PhraseMatch<'_>> = Vec::new();
        for (_, m) in all {
            if kept.last().is_some_and(|prev| m.start < prev.end) {
                continue;
            }
            kept.push(m);
        }
        kept
    }

    fn rewrite_section(&self, section: &Section, manifest: &mut PersonaManifest) -> Section {
        let matches = self.phrase_matches(&section.content);

        let mut content = section.content.clone();
        for m in &matches {
            manifest.slot_content.insert(
                m.slot_id.to_string(),
                section.content[m.start..m.end].to_string(),
            );
        }
        // Back to front so earlier offsets stay valid.
        for m in matches.iter().rev() {
            content.replace_range(m.start..m.end, &insert_inline_slot(m.slot_id));
        }

        Section {
            level: section.level,
            title: section.title.clone(),
            content,
            start_line: section.start_line,
            end_line: section.end_line,
            children: section
                .children
                .iter()
                .map(|child| self.rewrite_section(child, manifest))
                .collect(),
        }
    }
}

impl Extractor for RuleExtractor {
    fn extract(&self, doc: &Document) -> Result<Extraction> {
        if self.rules.is_whole_file_rule(doc.file_name()) {
            debug!(path = %doc.path, "whole-file persona rule");
            return Ok(Extraction::persona(record_persona_path(
                DocumentKind::Rule,
                &doc.path,
            )));
        }

        let mut manifest = PersonaManifest::new();
        let sections = doc
            .sections
            .iter()
            .map(|section| self.rewrite_section(section, &mut manifest))
            .collect();

        if !manifest.slot_content.is_empty() {
            debug!(
                path = %doc.path,
                slots = manifest.slot_content.len(),
                "inline content slots in rule"
            );
        }

        Ok(Extraction::core(
            Document {
                path: doc.path.clone(),
                frontmatter: doc.frontmatter.clone(),
                sections,
                raw_content: doc.raw_content.clone(),
            },
            manifest,
        ))
    }
}
