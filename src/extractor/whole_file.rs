use tracing::debug;

use super::{DocumentKind, Extraction, Extractor};
use crate::document::Document;
use crate::error::Result;
use crate::manifest::PersonaManifest;

/// Manifest recording `path` under the list for `kind`.
///
/// Kinds without a persona list (settings) produce an empty manifest.
pub fn record_persona_path(kind: DocumentKind, path: &str) -> PersonaManifest {
    let mut manifest = PersonaManifest::new();
    let path = path.to_string();
    match kind {
        DocumentKind::Directive => manifest.claude_md = path,
        DocumentKind::Agent => manifest.agents.push(path),
        DocumentKind::Skill => manifest.skills.push(path),
        DocumentKind::Rule => manifest.rules.push(path),
        DocumentKind::Style => manifest.styles.push(path),
        DocumentKind::Character => manifest.characters.push(path),
        DocumentKind::Spinner => manifest.spinners.push(path),
        DocumentKind::Command => manifest.commands.push(path),
        DocumentKind::Hook => manifest.hook_scripts.push(path),
        DocumentKind::Settings => {}
    }
    manifest
}

/// Extractor for kinds that are persona by membership alone: the root
/// directive, styles and characters.
#[derive(Debug, Clone, Copy)]
pub struct WholeFileExtractor {
    kind: DocumentKind,
}

impl WholeFileExtractor {
    pub fn new(kind: DocumentKind) -> Self {
        Self { kind }
    }
}

impl Extractor for WholeFileExtractor {
    fn extract(&self, doc: &Document) -> Result<Extraction> {
        debug!(path = %doc.path, kind = %self.kind, "whole-file persona");
        Ok(Extraction::persona(record_persona_path(self.kind, &doc.path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    fn doc(path: &str) -> Document {
        Document {
            path: path.to_string(),
            sections: vec![Section::new(1, "Anything", "# Anything\nbody")],
            ..Document::default()
        }
    }

    #[test]
    fn test_directive_sets_claude_md() {
        let out = WholeFileExtractor::new(DocumentKind::Directive)
            .extract(&doc("CLAUDE.md"))
            .unwrap();
        assert!(out.is_persona());
        assert_eq!(out.manifest.claude_md, "CLAUDE.md");
    }

    #[test]
    fn test_style_and_character_lists() {
        let style = WholeFileExtractor::new(DocumentKind::Style)
            .extract(&doc("output-styles/moai/r2d2.md"))
            .unwrap();
        assert_eq!(style.manifest.styles, vec!["output-styles/moai/r2d2.md"]);

        let character = WholeFileExtractor::new(DocumentKind::Character)
            .extract(&doc("characters/yoda.md"))
            .unwrap();
        assert!(character.core.is_none());
        assert_eq!(character.manifest.characters, vec!["characters/yoda.md"]);
    }

    #[test]
    fn test_record_path_only_kinds() {
        assert_eq!(
            record_persona_path(DocumentKind::Hook, "hooks/moai/pre.sh").hook_scripts,
            vec!["hooks/moai/pre.sh"]
        );
        assert_eq!(
            record_persona_path(DocumentKind::Spinner, "spinners/dots.yaml").spinners,
            vec!["spinners/dots.yaml"]
        );
        assert!(record_persona_path(DocumentKind::Settings, "settings.json").is_empty());
    }
}
