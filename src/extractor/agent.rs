use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{DocumentKind, Extraction, Extractor};
use crate::classifier::{SectionClassification, SectionClassifier};
use crate::document::{Document, Frontmatter, Section};
use crate::error::Result;
use crate::manifest::{AgentPatch, PersonaManifest};
use crate::rules::RuleRegistry;
use crate::slots::insert_section_slot;

use super::whole_file::record_persona_path;

/// Agent definitions: whole-file check, then section slots and skill
/// partitioning.
#[derive(Debug, Clone)]
pub struct AgentExtractor {
    rules: Arc<RuleRegistry>,
    classifier: SectionClassifier,
}

impl AgentExtractor {
    pub fn new(rules: Arc<RuleRegistry>) -> Self {
        Self {
            classifier: SectionClassifier::new(Arc::clone(&rules)),
            rules,
        }
    }
}

impl Extractor for AgentExtractor {
    fn extract(&self, doc: &Document) -> Result<Extraction> {
        if self.rules.is_whole_file_agent(doc.name()) {
            debug!(path = %doc.path, name = doc.name(), "whole-file persona agent");
            return Ok(Extraction::persona(record_persona_path(
                DocumentKind::Agent,
                &doc.path,
            )));
        }

        let mut manifest = PersonaManifest::new();
        let classification = self.classifier.classify(doc);

        // Verdicts are in pre-order, the same order rebuild_section visits.
        let mut verdicts = classification.sections.iter();
        let sections = doc
            .sections
            .iter()
            .map(|section| rebuild_section(section, &mut verdicts, &mut manifest))
            .collect();

        let persona_skills: HashSet<&str> = classification
            .skill_refs
            .iter()
            .map(|sr| sr.skill_name.as_str())
            .collect();
        let frontmatter = doc.frontmatter.as_ref().map(|fm| {
            let (core_fm, removed) = partition_skills(fm, &persona_skills);
            if !removed.is_empty() {
                debug!(path = %doc.path, skills = ?removed, "persona skills removed from agent");
                manifest.agent_patches.insert(
                    doc.path.clone(),
                    AgentPatch {
                        append_skills: removed,
                        remove_skills: Vec::new(),
                    },
                );
            }
            core_fm
        });

        let core = Document {
            path: doc.path.clone(),
            frontmatter,
            sections,
            raw_content: doc.raw_content.clone(),
        };
        Ok(Extraction::core(core, manifest))
    }
}

/// Clones `section`, replacing persona bodies that carry a slot id with a
/// section slot marker and recording the original text.
fn rebuild_section(
    section: &Section,
    verdicts: &mut std::slice::Iter<'_, SectionClassification<'_>>,
    manifest: &mut PersonaManifest,
) -> Section {
    let mut clone = Section {
        level: section.level,
        title: section.title.clone(),
        content: section.content.clone(),
        start_line: section.start_line,
        end_line: section.end_line,
        children: Vec::new(),
    };

    if let Some(verdict) = verdicts.next() {
        if let (true, Some(slot_id)) = (verdict.is_persona, verdict.slot_id.as_deref()) {
            manifest
                .slot_content
                .insert(slot_id.to_string(), section.content.clone());
            clone.content = insert_section_slot(slot_id, "");
        }
    }

    clone.children = section
        .children
        .iter()
        .map(|child| rebuild_section(child, verdicts, manifest))
        .collect();
    clone
}

/// Splits the skill list into kept and removed names, keeping order within
/// each half. The raw `skills` entry follows the kept list.
fn partition_skills(fm: &Frontmatter, persona: &HashSet<&str>) -> (Frontmatter, Vec<String>) {
    let (removed, kept): (Vec<String>, Vec<String>) = fm
        .skills
        .iter()
        .cloned()
        .partition(|name| persona.contains(name.as_str()));

    let mut core = fm.clone();
    if !removed.is_empty() && core.raw.contains_key("skills") {
        core.raw.insert(
            "skills".to_string(),
            Value::Array(kept.iter().cloned().map(Value::String).collect()),
        );
    }
    core.skills = kept;
    (core, removed)
}
