//! Classification rule tables and their compiled form.
//!
//! `RuleRegistry` is built once per run from a [`RuleConfig`]. Every regex and
//! module glob is compiled up front, so a bad rule fails the run before any
//! file is read.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RuleConfig;
use crate::error::{Result, SplitError};
use crate::slots::is_valid_slot_id;

/// File name of a skill's entry document. Never a persona module.
pub const SKILL_ENTRY_FILE: &str = "SKILL.md";

/// Section header regex that marks a persona section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPattern {
    pub pattern: String,
    pub slot_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Hardcoded persona path literal found in content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPattern {
    pub pattern: String,
    pub slot_id: String,
}

/// Skill name that is persona-specific when referenced from agent frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPattern {
    pub skill_name: String,
    pub category: String,
}

/// Phrase-level regex replaced inline in rule bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPattern {
    pub pattern: String,
    pub slot_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// A persona module inside an otherwise core skill.
///
/// `module_glob` is relative to the skill directory, e.g. `modules/ddd`.
/// Each `/`-separated segment may use glob syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialModuleRule {
    pub skill_name: String,
    pub module_glob: String,
}

#[derive(Debug)]
struct Compiled<T> {
    rule: T,
    re: Regex,
}

#[derive(Debug)]
struct ModuleMatcher {
    segments: Vec<glob::Pattern>,
}

impl ModuleMatcher {
    fn compile(rule: &PartialModuleRule) -> Result<Self> {
        let segments = rule
            .module_glob
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| {
                glob::Pattern::new(seg).map_err(|e| SplitError::PatternCompile {
                    kind: "module",
                    pattern: rule.module_glob.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if segments.is_empty() {
            return Err(SplitError::PatternCompile {
                kind: "module",
                pattern: rule.module_glob.clone(),
                message: "module path is empty".to_string(),
            });
        }
        Ok(Self { segments })
    }

    /// Leading rule segments must match path segments one for one. The last
    /// rule segment matches either a directory (more path follows) or the
    /// final file, with or without its extension. `modules/ddd` therefore
    /// matches `modules/ddd/core.md` and `modules/ddd.md` but never
    /// `modules/ddd-context7/core.md`.
    fn matches(&self, path: &[&str]) -> bool {
        let n = self.segments.len();
        if path.len() < n {
            return false;
        }
        let leading_ok = self.segments[..n - 1]
            .iter()
            .zip(path)
            .all(|(pat, seg)| pat.matches(seg));
        if !leading_ok {
            return false;
        }

        let last = &self.segments[n - 1];
        let candidate = path[n - 1];
        if path.len() > n {
            return last.matches(candidate);
        }
        last.matches(candidate)
            || candidate
                .rsplit_once('.')
                .is_some_and(|(stem, _)| !stem.is_empty() && last.matches(stem))
    }
}

/// Slot ids end up inside markers, so they must use the marker alphabet.
fn check_slot_id(slot_id: &str) -> Result<()> {
    if is_valid_slot_id(slot_id) {
        return Ok(());
    }
    Err(SplitError::PatternCompile {
        kind: "slot",
        pattern: slot_id.to_string(),
        message: "slot id must match [A-Z][A-Z0-9_]*".to_string(),
    })
}

fn compile_regex(kind: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SplitError::PatternCompile {
        kind,
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compiled, immutable rule set consulted by the classifier and extractors.
#[derive(Debug)]
pub struct RuleRegistry {
    headers: Vec<Compiled<HeaderPattern>>,
    paths: Vec<Compiled<PathPattern>>,
    contents: Vec<Compiled<ContentPattern>>,
    skills: HashMap<String, SkillPattern>,
    partial_modules: HashMap<String, Vec<ModuleMatcher>>,
    whole_file_agents: HashSet<String>,
    whole_file_skills: HashSet<String>,
    whole_file_skill_dirs: HashSet<String>,
    whole_file_rules: HashSet<String>,
}

impl RuleRegistry {
    /// Compile every rule in `config`.
    pub fn new(config: &RuleConfig) -> Result<Self> {
        let headers = config
            .header_patterns
            .iter()
            .map(|rule| {
                check_slot_id(&rule.slot_id)?;
                Ok(Compiled {
                    re: compile_regex("header", &rule.pattern)?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let paths = config
            .path_patterns
            .iter()
            .map(|rule| {
                Ok(Compiled {
                    re: compile_regex("path", &rule.pattern)?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let contents = config
            .content_patterns
            .iter()
            .map(|rule| {
                check_slot_id(&rule.slot_id)?;
                Ok(Compiled {
                    re: compile_regex("content", &rule.pattern)?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // First declaration of a skill name wins its category.
        let mut skills = HashMap::new();
        for sp in &config.skill_patterns {
            skills
                .entry(sp.skill_name.clone())
                .or_insert_with(|| sp.clone());
        }

        let mut partial_modules: HashMap<String, Vec<ModuleMatcher>> = HashMap::new();
        for rule in &config.partial_modules {
            partial_modules
                .entry(rule.skill_name.clone())
                .or_default()
                .push(ModuleMatcher::compile(rule)?);
        }

        let set = |items: &[String]| items.iter().cloned().collect::<HashSet<_>>();

        debug!(
            headers = headers.len(),
            paths = paths.len(),
            contents = contents.len(),
            skills = skills.len(),
            "compiled rule registry"
        );

        Ok(Self {
            headers,
            paths,
            contents,
            skills,
            partial_modules,
            whole_file_agents: set(&config.whole_file_agents),
            whole_file_skills: set(&config.whole_file_skills),
            whole_file_skill_dirs: set(&config.whole_file_skill_dirs),
            whole_file_rules: set(&config.whole_file_rules),
        })
    }

    /// Registry over the built-in rule tables.
    pub fn builtin() -> Result<Self> {
        Self::new(&RuleConfig::default())
    }

    /// First header pattern, in declaration order, whose regex matches `title`.
    pub fn match_header(&self, title: &str) -> Option<&HeaderPattern> {
        self.headers
            .iter()
            .find(|c| c.re.is_match(title))
            .map(|c| &c.rule)
    }

    pub fn path_patterns(&self) -> impl Iterator<Item = (&PathPattern, &Regex)> {
        self.paths.iter().map(|c| (&c.rule, &c.re))
    }

    pub fn content_patterns(&self) -> impl Iterator<Item = (&ContentPattern, &Regex)> {
        self.contents.iter().map(|c| (&c.rule, &c.re))
    }

    pub fn skill_pattern(&self, skill_name: &str) -> Option<&SkillPattern> {
        self.skills.get(skill_name)
    }

    pub fn is_whole_file_agent(&self, name: &str) -> bool {
        self.whole_file_agents.contains(name)
    }

    pub fn is_whole_file_skill(&self, name: &str) -> bool {
        self.whole_file_skills.contains(name)
    }

    /// Skill directory whose entire contents are persona.
    ///
    /// Exact name match only. An entry `moai` does not cover
    /// `moai-workflow-testing`; brand-prefixed directories fall through to
    /// the whole-file skill and partial-module checks.
    pub fn is_whole_file_skill_dir(&self, dir_name: &str) -> bool {
        self.whole_file_skill_dirs.contains(dir_name)
    }

    /// Exact file-name match, independent of directory depth.
    pub fn is_whole_file_rule(&self, file_name: &str) -> bool {
        self.whole_file_rules.contains(file_name)
    }

    pub fn is_partial_skill(&self, skill_name: &str) -> bool {
        self.partial_modules.contains_key(skill_name)
    }

    /// Whether `module_rel_path` (relative to the skill directory) falls in a
    /// persona module of `skill_name`. The skill entry file never does.
    pub fn is_partial_persona_module(&self, skill_name: &str, module_rel_path: &str) -> bool {
        if module_rel_path == SKILL_ENTRY_FILE {
            return false;
        }
        let Some(matchers) = self.partial_modules.get(skill_name) else {
            return false;
        };
        let segments: Vec<&str> = module_rel_path
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect();
        matchers.iter().any(|m| m.matches(&segments))
    }
}
