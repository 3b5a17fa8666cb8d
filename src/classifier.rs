//! Section-level persona detection.
//!
//! The classifier walks a document's section tree, matches header titles
//! against the registry's header patterns, picks persona skills out of the
//! frontmatter skill list and reports hardcoded persona path literals.

use std::sync::Arc;

use serde::Serialize;

use crate::document::{Document, Frontmatter, Section};
use crate::rules::RuleRegistry;

/// Verdict for a single section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionClassification<'a> {
    pub section: &'a Section,
    pub is_persona: bool,
    pub reason: String,
    pub slot_id: Option<String>,
    /// 1.0 on an exact rule match, 0.0 otherwise.
    pub confidence: f64,
}

/// Persona skill referenced from frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillClassification {
    pub skill_name: String,
    pub category: String,
}

/// Hardcoded persona path found in content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMatch {
    pub original: String,
    pub slot_id: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based byte column of the match start.
    pub column: usize,
}

/// Everything the classifier learned about one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult<'a> {
    pub doc_path: String,
    /// Pre-order, parents before children.
    pub sections: Vec<SectionClassification<'a>>,
    pub skill_refs: Vec<SkillClassification>,
    /// Sorted by (line, column).
    pub path_refs: Vec<PathMatch>,
}

impl ClassificationResult<'_> {
    pub fn persona_sections(&self) -> impl Iterator<Item = &SectionClassification<'_>> {
        self.sections.iter().filter(|sc| sc.is_persona)
    }
}

#[derive(Debug, Clone)]
pub struct SectionClassifier {
    rules: Arc<RuleRegistry>,
}

impl SectionClassifier {
    pub fn new(rules: Arc<RuleRegistry>) -> Self {
        Self { rules }
    }

    pub fn classify<'a>(&self, doc: &'a Document) -> ClassificationResult<'a> {
        let sections = doc
            .sections_preorder()
            .into_iter()
            .map(|section| self.classify_section(section))
            .collect();

        let mut path_refs = Vec::new();
        for section in doc.sections_preorder() {
            let base = section.start_line.max(1);
            path_refs.extend(self.scan_paths(&section.content, base));
        }
        sort_path_matches(&mut path_refs);

        ClassificationResult {
            doc_path: doc.path.clone(),
            sections,
            skill_refs: self.detect_skill_refs(doc.frontmatter.as_ref()),
            path_refs,
        }
    }

    pub fn classify_section<'a>(&self, section: &'a Section) -> SectionClassification<'a> {
        match self.rules.match_header(&section.title) {
            Some(pattern) => SectionClassification {
                section,
                is_persona: true,
                reason: format!("header matches pattern: {}", pattern.description),
                slot_id: Some(pattern.slot_id.clone()).filter(|id| !id.is_empty()),
                confidence: 1.0,
            },
            None => SectionClassification {
                section,
                is_persona: false,
                reason: "no persona pattern matched".to_string(),
                slot_id: None,
                confidence: 0.0,
            },
        }
    }

    /// Persona skills in frontmatter order. Names with no rule are skipped.
    pub fn detect_skill_refs(&self, frontmatter: Option<&Frontmatter>) -> Vec<SkillClassification> {
        let Some(fm) = frontmatter else {
            return Vec::new();
        };
        fm.skills
            .iter()
            .filter_map(|name| self.rules.skill_pattern(name))
            .map(|sp| SkillClassification {
                skill_name: sp.skill_name.clone(),
                category: sp.category.clone(),
            })
            .collect()
    }

    /// Path literals in `content`, with lines counted from 1 within it.
    pub fn detect_path_patterns(&self, content: &str) -> Vec<PathMatch> {
        let mut matches = self.scan_paths(content, 1);
        sort_path_matches(&mut matches);
        matches
    }

    fn scan_paths(&self, content: &str, first_line: usize) -> Vec<PathMatch> {
        let mut matches = Vec::new();
        for (pattern, re) in self.rules.path_patterns() {
            for (idx, line) in content.split('\n').enumerate() {
                for m in re.find_iter(line) {
                    matches.push(PathMatch {
                        original: m.as_str().to_string(),
                        slot_id: pattern.slot_id.clone(),
                        line: first_line + idx,
                        column: m.start() + 1,
                    });
                }
            }
        }
        matches
    }
}

fn sort_path_matches(matches: &mut [PathMatch]) {
    matches.sort_by_key(|m| (m.line, m.column));
}
