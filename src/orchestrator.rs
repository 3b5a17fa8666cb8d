//! Directory walk, routing and merge.
//!
//! One [`Orchestrator::extract`] call walks a source tree once, routes each
//! file to its extractor and folds the per-file results into a single
//! [`PersonaManifest`] and [`SlotRegistry`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ignore::WalkBuilder;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::Config;
use crate::document::Document;
use crate::error::{Result, SplitError};
use crate::extractor::settings::SETTINGS_FILE;
use crate::extractor::whole_file::record_persona_path;
use crate::extractor::{
    AgentExtractor, DocumentKind, Extraction, Extractor, RuleExtractor, SettingsSplitter,
    SkillExtractor, WholeFileExtractor,
};
use crate::manifest::PersonaManifest;
use crate::parser::{DocumentParser, MarkdownParser};
use crate::rules::RuleRegistry;
use crate::slotifier::BrandSlotifier;
use crate::slots::SlotRegistry;

/// Root directive file name, matched case-insensitively.
pub const DIRECTIVE_FILE: &str = "CLAUDE.md";

/// Directory (and file) names never visited.
const SKIP_NAMES: &[&str] = &[".git", "node_modules", ".DS_Store", "__pycache__"];

/// Categories that count toward persona-name inference.
const NAME_CATEGORIES: &[&str] = &[
    "agents",
    "rules",
    "commands",
    "hooks",
    "output-styles",
    "skills",
];

/// Routing decision for a path relative to the source root.
///
/// Root directive and settings files win over directory routing; anything
/// outside a known category is `None`.
pub fn route(rel_path: &str) -> Option<DocumentKind> {
    match rel_path.split_once('/') {
        None if rel_path.eq_ignore_ascii_case(DIRECTIVE_FILE) => Some(DocumentKind::Directive),
        None if rel_path == SETTINGS_FILE => Some(DocumentKind::Settings),
        None => None,
        Some((top, _)) => DocumentKind::from_category(top),
    }
}

fn is_markdown(rel_path: &str) -> bool {
    rel_path.ends_with(".md")
}

/// Kinds whose files are only tracked by path, never parsed.
fn is_path_only(kind: DocumentKind) -> bool {
    matches!(
        kind,
        DocumentKind::Spinner | DocumentKind::Command | DocumentKind::Hook
    )
}

/// Candidate persona name: the subdirectory shared by persona files across
/// the most categories, if at least two. Ties go to the smallest name.
pub fn infer_persona_name<'a>(persona_paths: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut seen: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for path in persona_paths {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < 3 || !NAME_CATEGORIES.contains(&parts[0]) {
            continue;
        }
        seen.entry(parts[1]).or_default().insert(parts[0]);
    }

    let mut best: Option<(&str, usize)> = None;
    for (&name, categories) in &seen {
        let count = categories.len();
        if count >= 2 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitOutput {
    pub manifest: PersonaManifest,
    pub registry: SlotRegistry,
    /// Core remainder of every parsed document that was not wholly persona,
    /// keyed by relative path.
    pub core_documents: BTreeMap<String, Document>,
    /// Core half of the root settings file, if there was one.
    pub core_settings: Option<Map<String, Value>>,
}

/// Walks a source tree and splits it into core and persona.
pub struct Orchestrator<P = MarkdownParser> {
    parser: P,
    rules: Arc<RuleRegistry>,
    agent: AgentExtractor,
    skill: SkillExtractor,
    rule: RuleExtractor,
    settings: SettingsSplitter,
    brand: Option<String>,
}

impl Orchestrator<MarkdownParser> {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parser(config, MarkdownParser::new())
    }
}

impl<P: DocumentParser> Orchestrator<P> {
    /// Compiles the rule tables in `config`. Fails before any file is read
    /// if a rule is invalid.
    pub fn with_parser(config: &Config, parser: P) -> Result<Self> {
        let rules = Arc::new(RuleRegistry::new(&config.rules)?);
        Ok(Self {
            parser,
            agent: AgentExtractor::new(Arc::clone(&rules)),
            skill: SkillExtractor::new(Arc::clone(&rules)),
            rule: RuleExtractor::new(Arc::clone(&rules)),
            settings: SettingsSplitter::new(&config.settings),
            brand: config.brand().map(str::to_string),
            rules,
        })
    }

    /// Walks `source_dir` in file-name order and extracts every routed file.
    pub fn extract(&self, source_dir: &Path) -> Result<SplitOutput> {
        let root = std::path::absolute(source_dir).map_err(|e| SplitError::io(source_dir, e))?;
        let paths = walk(&root)?;
        self.extract_paths(&root, paths)
    }

    /// Extracts the given relative paths under `source_dir`, in order.
    ///
    /// Unrouted paths are skipped. The parent-directory directive fallback
    /// and persona-name inference run after the last path.
    pub fn extract_paths<I, S>(&self, source_dir: &Path, rel_paths: I) -> Result<SplitOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = std::path::absolute(source_dir).map_err(|e| SplitError::io(source_dir, e))?;
        let source = root.display().to_string();
        info!(source = %source, "extracting persona");

        let mut out = SplitOutput::default();
        out.registry.source = Some(source.clone());
        out.manifest.source_dir = source;

        for rel_path in rel_paths {
            self.process_file(&root, rel_path.as_ref(), &mut out)?;
        }

        if out.manifest.claude_md.is_empty() {
            self.fallback_directive(&root, &mut out)?;
        }

        let inferred = infer_persona_name(out.manifest.persona_files.keys().map(String::as_str));
        if let Some(name) = &inferred {
            debug!(name = %name, "inferred persona name");
        }
        if out.manifest.name.is_empty() {
            out.manifest.name = inferred.clone().unwrap_or_default();
        }

        let brand = self.brand.clone().or(inferred).unwrap_or_default();
        let slotifier = BrandSlotifier::new(&brand);
        if slotifier.is_enabled() {
            out.manifest.skill_mappings = skill_mappings(&slotifier, &out.manifest.core_files);
            out.manifest.brand = brand;
        }

        info!(
            agents = out.manifest.agents.len(),
            skills = out.manifest.skills.len(),
            rules = out.manifest.rules.len(),
            core_files = out.manifest.core_files.len(),
            persona_files = out.manifest.persona_files.len(),
            slots = out.registry.len(),
            "extraction complete"
        );
        Ok(out)
    }

    /// Runs the extractor for `kind` on a parsed document.
    pub fn extract_document(&self, kind: DocumentKind, doc: &Document) -> Result<Extraction> {
        match kind {
            DocumentKind::Agent => self.agent.extract(doc),
            DocumentKind::Skill => self.skill.extract(doc),
            DocumentKind::Rule => self.rule.extract(doc),
            DocumentKind::Settings => Ok(Extraction::core(doc.clone(), PersonaManifest::new())),
            other => WholeFileExtractor::new(other).extract(doc),
        }
    }

    fn process_file(&self, root: &Path, rel_path: &str, out: &mut SplitOutput) -> Result<()> {
        let Some(kind) = route(rel_path) else {
            debug!(path = rel_path, "skipping unrouted file");
            return Ok(());
        };
        let abs_path = root.join(rel_path);
        debug!(path = rel_path, kind = %kind, "routing file");

        if kind == DocumentKind::Settings {
            return self.process_settings(rel_path, &abs_path, out);
        }
        if is_path_only(kind) || !is_markdown(rel_path) {
            return self.process_asset(kind, rel_path, &abs_path, out);
        }

        let content = read(&abs_path)?;
        let doc = self.parser.parse(&content, rel_path)?;
        let extraction = self.extract_document(kind, &doc)?;
        out.manifest.merge(extraction.manifest);

        match extraction.core {
            Some(core) => {
                out.registry.register_document(&core, kind.as_str());
                out.manifest.core_files.push(rel_path.to_string());
                out.core_documents.insert(rel_path.to_string(), core);
            }
            None => {
                out.manifest
                    .persona_files
                    .insert(rel_path.to_string(), abs_path.display().to_string());
            }
        }
        Ok(())
    }

    /// Files that are tracked without parsing: non-markdown files and the
    /// path-only kinds.
    fn process_asset(
        &self,
        kind: DocumentKind,
        rel_path: &str,
        abs_path: &Path,
        out: &mut SplitOutput,
    ) -> Result<()> {
        let persona = match kind {
            DocumentKind::Skill => self.skill.is_persona_path(rel_path, None)?,
            DocumentKind::Rule => {
                let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
                self.rules.is_whole_file_rule(file_name)
            }
            // an agent asset has no frontmatter name to match
            DocumentKind::Agent => false,
            other => other.is_always_persona(),
        };

        if !persona {
            out.manifest.core_files.push(rel_path.to_string());
            return Ok(());
        }
        if is_path_only(kind) {
            out.manifest.merge(record_persona_path(kind, rel_path));
        }
        out.manifest
            .persona_files
            .insert(rel_path.to_string(), abs_path.display().to_string());
        Ok(())
    }

    fn process_settings(
        &self,
        rel_path: &str,
        abs_path: &Path,
        out: &mut SplitOutput,
    ) -> Result<()> {
        let content = read(abs_path)?;
        let split = self.settings.split_str(&content, rel_path)?;

        if split.persona.is_empty() {
            out.manifest.core_files.push(rel_path.to_string());
        } else {
            out.manifest
                .persona_files
                .insert(rel_path.to_string(), abs_path.display().to_string());
        }
        out.manifest.settings.extend(split.persona);
        out.core_settings = Some(split.core);
        Ok(())
    }

    /// Looks for the directive file next to the source directory. Only
    /// called when the walk found none.
    fn fallback_directive(&self, root: &Path, out: &mut SplitOutput) -> Result<()> {
        let Some(parent) = root.parent() else {
            return Ok(());
        };
        let candidate = parent.join(DIRECTIVE_FILE);
        if !candidate.is_file() {
            return Ok(());
        }
        info!(path = %candidate.display(), "using directive file from parent directory");

        let content = read(&candidate)?;
        let doc = self.parser.parse(&content, DIRECTIVE_FILE)?;
        let extraction = self.extract_document(DocumentKind::Directive, &doc)?;
        out.manifest.merge(extraction.manifest);
        out.manifest
            .persona_files
            .insert(DIRECTIVE_FILE.to_string(), candidate.display().to_string());
        Ok(())
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| SplitError::io(path, e))
}

/// Relative `/`-separated paths of every file under `root`, sorted by name
/// within each directory.
fn walk(root: &Path) -> Result<Vec<String>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !SKIP_NAMES.contains(&name))
        })
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| SplitError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        paths.push(to_slash(rel));
    }
    Ok(paths)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Skill directory renames for core skills whose directory carries the
/// brand prefix.
fn skill_mappings(slotifier: &BrandSlotifier, core_files: &[String]) -> BTreeMap<String, String> {
    core_files
        .iter()
        .filter_map(|path| {
            let dir = path.strip_prefix("skills/")?.split_once('/')?.0;
            let stripped = slotifier.strip_brand_prefix(dir);
            (stripped != dir).then(|| (dir.to_string(), stripped.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_root_files() {
        assert_eq!(route("CLAUDE.md"), Some(DocumentKind::Directive));
        assert_eq!(route("claude.md"), Some(DocumentKind::Directive));
        assert_eq!(route("settings.json"), Some(DocumentKind::Settings));
        assert_eq!(route("Settings.json"), None);
        assert_eq!(route("README.md"), None);
    }

    #[test]
    fn test_route_nested_root_names_use_directory() {
        assert_eq!(route("agents/CLAUDE.md"), Some(DocumentKind::Agent));
        assert_eq!(route("docs/CLAUDE.md"), None);
        assert_eq!(route("rules/settings.json"), Some(DocumentKind::Rule));
    }

    #[test]
    fn test_route_categories() {
        assert_eq!(route("agents/moai/a.md"), Some(DocumentKind::Agent));
        assert_eq!(route("skills/x/SKILL.md"), Some(DocumentKind::Skill));
        assert_eq!(route("output-styles/moai/r2d2.md"), Some(DocumentKind::Style));
        assert_eq!(route("characters/yoda.md"), Some(DocumentKind::Character));
        assert_eq!(route("spinners/dots.yaml"), Some(DocumentKind::Spinner));
        assert_eq!(route("commands/moai/plan.md"), Some(DocumentKind::Command));
        assert_eq!(route("hooks/moai/pre.sh"), Some(DocumentKind::Hook));
        assert_eq!(route("templates/x.md"), None);
    }

    #[test]
    fn test_infer_persona_name_requires_two_categories() {
        let paths = ["agents/moai/a.md", "agents/moai/b.md", "agents/moai/c.md"];
        assert_eq!(infer_persona_name(paths), None);

        let paths = ["agents/moai/a.md", "rules/moai/b.md", "agents/do/x.md"];
        assert_eq!(infer_persona_name(paths).as_deref(), Some("moai"));
    }

    #[test]
    fn test_infer_persona_name_ignores_shallow_and_foreign_paths() {
        let paths = [
            "agents/a.md",
            "rules/b.md",
            "characters/moai/x.md",
            "styles/moai/y.md",
        ];
        assert_eq!(infer_persona_name(paths), None);
    }

    #[test]
    fn test_infer_persona_name_most_categories_then_smallest() {
        let paths = [
            "agents/zeta/a.md",
            "rules/zeta/b.md",
            "hooks/zeta/c.sh",
            "agents/alpha/a.md",
            "rules/alpha/b.md",
        ];
        assert_eq!(infer_persona_name(paths).as_deref(), Some("zeta"));

        let tied = [
            "agents/zeta/a.md",
            "rules/zeta/b.md",
            "agents/alpha/a.md",
            "rules/alpha/b.md",
        ];
        assert_eq!(infer_persona_name(tied).as_deref(), Some("alpha"));
    }

    #[test]
    fn test_skill_mappings_only_for_prefixed_dirs() {
        let slotifier = BrandSlotifier::new("moai");
        let core_files = vec![
            "skills/moai-lang-python/SKILL.md".to_string(),
            "skills/moai-lang-python/modules/a.md".to_string(),
            "skills/do-lang-go/SKILL.md".to_string(),
            "agents/moai-x.md".to_string(),
        ];
        let mappings = skill_mappings(&slotifier, &core_files);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings["moai-lang-python"], "lang-python");
    }
}
