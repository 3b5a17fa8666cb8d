use std::sync::Arc;

use tracing::debug;

use super::whole_file::record_persona_path;
use super::{DocumentKind, Extraction, Extractor};
use crate::document::Document;
use crate::error::{Result, SplitError};
use crate::rules::RuleRegistry;

const SKILLS_DIR: &str = "skills";

/// A path under `skills/`, split into the skill directory and the module
/// path relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillLocation<'a> {
    /// `None` for files directly under `skills/`.
    pub skill_dir: Option<&'a str>,
    pub module_path: &'a str,
}

impl<'a> SkillLocation<'a> {
    pub fn parse(rel_path: &'a str) -> Result<Self> {
        let structure = |message: &str| SplitError::Structure {
            path: rel_path.to_string(),
            message: message.to_string(),
        };

        let rest = rel_path
            .strip_prefix(SKILLS_DIR)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| structure("path is not under the skills directory"))?;
        if rest.is_empty() || rest.split('/').any(str::is_empty) {
            return Err(structure("empty path segment under the skills directory"));
        }

        Ok(match rest.split_once('/') {
            Some((dir, module_path)) => Self {
                skill_dir: Some(dir),
                module_path,
            },
            None => Self {
                skill_dir: None,
                module_path: rest,
            },
        })
    }
}

/// Skill files and assets: whole-file skills, whole persona skill
/// directories and persona modules of partial skills.
#[derive(Debug, Clone)]
pub struct SkillExtractor {
    rules: Arc<RuleRegistry>,
}

impl SkillExtractor {
    pub fn new(rules: Arc<RuleRegistry>) -> Self {
        Self { rules }
    }

    /// Whether the file at `rel_path` belongs to the persona.
    ///
    /// `frontmatter_name` is the skill's declared name when the file was
    /// parsed; assets pass `None` and are judged by their directory.
    pub fn is_persona_path(&self, rel_path: &str, frontmatter_name: Option<&str>) -> Result<bool> {
        let location = SkillLocation::parse(rel_path)?;

        if frontmatter_name.is_some_and(|name| self.rules.is_whole_file_skill(name)) {
            return Ok(true);
        }

        let Some(dir) = location.skill_dir else {
            return Ok(false);
        };
        if self.rules.is_whole_file_skill(dir) || self.rules.is_whole_file_skill_dir(dir) {
            return Ok(true);
        }
        Ok(self.rules.is_partial_skill(dir)
            && self.rules.is_partial_persona_module(dir, location.module_path))
    }
}

impl Extractor for SkillExtractor {
    fn extract(&self, doc: &Document) -> Result<Extraction> {
        let name = doc.frontmatter.as_ref().map(|fm| fm.name.as_str());
        if self.is_persona_path(&doc.path, name)? {
            debug!(path = %doc.path, "persona skill file");
            return Ok(Extraction::persona(record_persona_path(
                DocumentKind::Skill,
                &doc.path,
            )));
        }
        Ok(Extraction::core(doc.clone(), Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Frontmatter;

    fn extractor() -> SkillExtractor {
        SkillExtractor::new(Arc::new(RuleRegistry::builtin().unwrap()))
    }

    fn skill_doc(path: &str, name: &str) -> Document {
        Document {
            path: path.to_string(),
            frontmatter: Some(Frontmatter {
                name: name.to_string(),
                ..Frontmatter::default()
            }),
            ..Document::default()
        }
    }

    #[test]
    fn test_location_split() {
        let loc = SkillLocation::parse("skills/moai-workflow-testing/modules/ddd/core.md").unwrap();
        assert_eq!(loc.skill_dir, Some("moai-workflow-testing"));
        assert_eq!(loc.module_path, "modules/ddd/core.md");

        let loose = SkillLocation::parse("skills/README.md").unwrap();
        assert_eq!(loose.skill_dir, None);
    }

    #[test]
    fn test_location_rejects_unrelated_paths() {
        assert!(matches!(
            SkillLocation::parse("agents/x.md"),
            Err(SplitError::Structure { .. })
        ));
        assert!(SkillLocation::parse("skills//SKILL.md").is_err());
        assert!(SkillLocation::parse("skillset/a/SKILL.md").is_err());
    }

    #[test]
    fn test_whole_file_skill_by_name() {
        let out = extractor()
            .extract(&skill_doc("skills/moai-workflow-tdd/SKILL.md", "moai-workflow-tdd"))
            .unwrap();
        assert!(out.is_persona());
        assert_eq!(out.manifest.skills, vec!["skills/moai-workflow-tdd/SKILL.md"]);
    }

    #[test]
    fn test_whole_persona_directory() {
        let out = extractor()
            .extract(&skill_doc("skills/moai/references/anything.md", "whatever"))
            .unwrap();
        assert!(out.is_persona());
    }

    #[test]
    fn test_partial_skill_modules() {
        let e = extractor();
        let persona = e
            .extract(&skill_doc(
                "skills/moai-workflow-testing/modules/ddd/core-classes.md",
                "",
            ))
            .unwrap();
        assert!(persona.is_persona());

        let entry = e
            .extract(&skill_doc(
                "skills/moai-workflow-testing/SKILL.md",
                "moai-workflow-testing",
            ))
            .unwrap();
        assert!(!entry.is_persona());

        let other = e
            .extract(&skill_doc("skills/moai-workflow-testing/modules/ai-debugging.md", ""))
            .unwrap();
        assert!(!other.is_persona());
    }

    #[test]
    fn test_core_skill_passthrough() {
        let doc = skill_doc("skills/do-lang-go/SKILL.md", "do-lang-go");
        let out = extractor().extract(&doc).unwrap();
        assert_eq!(out.core, Some(doc));
        assert!(out.manifest.is_empty());
    }

    #[test]
    fn test_assets_follow_directory_rules() {
        let e = extractor();
        assert!(e
            .is_persona_path("skills/moai-workflow-ddd/scripts/run.py", None)
            .unwrap());
        assert!(e
            .is_persona_path("skills/moai-workflow-testing/modules/ddd/fixture.json", None)
            .unwrap());
        assert!(!e.is_persona_path("skills/do-lang-go/examples/main.go", None).unwrap());
    }

    #[test]
    fn test_dir_prefix_is_not_a_persona_dir() {
        // only the exact `moai` directory is whole-persona
        assert!(!extractor()
            .is_persona_path("skills/moai-lang-python/SKILL.md", Some("moai-lang-python"))
            .unwrap());
    }
}
