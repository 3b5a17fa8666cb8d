use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::rules::{ContentPattern, HeaderPattern, PartialModuleRule, PathPattern, SkillPattern};

/// Repo-local config file name, checked before the user config directory.
pub const LOCAL_CONFIG_FILE: &str = "personasplit.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Brand token for slotification. Falls back to the inferred persona name.
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Rule tables, in the order they are evaluated.
///
/// Each table defaults to the built-in set, so a config file only overrides
/// the tables it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub header_patterns: Vec<HeaderPattern>,
    pub path_patterns: Vec<PathPattern>,
    pub skill_patterns: Vec<SkillPattern>,
    pub content_patterns: Vec<ContentPattern>,
    pub partial_modules: Vec<PartialModuleRule>,
    pub whole_file_agents: Vec<String>,
    pub whole_file_skills: Vec<String>,
    pub whole_file_skill_dirs: Vec<String>,
    pub whole_file_rules: Vec<String>,
}

/// Key sets for splitting the root settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Top-level keys that always belong to the persona.
    pub persona_keys: Vec<String>,
    /// `env` sub-keys that belong to the persona. Every other env key is core.
    pub persona_env_keys: Vec<String>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            persona_keys: strings(&[
                "hooks",
                "outputStyle",
                "plansDirectory",
                "attribution",
                "statusLine",
            ]),
            persona_env_keys: strings(&["MOAI_CONFIG_SOURCE"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn header(pattern: &str, slot_id: &str, category: &str, description: &str) -> HeaderPattern {
    HeaderPattern {
        pattern: pattern.to_string(),
        slot_id: slot_id.to_string(),
        category: category.to_string(),
        description: description.to_string(),
    }
}

fn content(pattern: &str, slot_id: &str, category: &str, description: &str) -> ContentPattern {
    ContentPattern {
        pattern: pattern.to_string(),
        slot_id: slot_id.to_string(),
        category: category.to_string(),
        description: description.to_string(),
    }
}

fn path(pattern: &str, slot_id: &str) -> PathPattern {
    PathPattern {
        pattern: pattern.to_string(),
        slot_id: slot_id.to_string(),
    }
}

fn skill(name: &str, category: &str) -> SkillPattern {
    SkillPattern {
        skill_name: name.to_string(),
        category: category.to_string(),
    }
}

fn module(skill_name: &str, module_glob: &str) -> PartialModuleRule {
    PartialModuleRule {
        skill_name: skill_name.to_string(),
        module_glob: module_glob.to_string(),
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            header_patterns: vec![
                header(
                    r"(?i)^TRUST\s*5\s+(Compliance|Validation|Framework)",
                    "QUALITY_FRAMEWORK",
                    "quality_framework",
                    "TRUST 5 quality compliance section",
                ),
                header(
                    r"(?i)^Security\s+&\s+TRUST\s+5",
                    "QUALITY_SECURITY_FRAMEWORK",
                    "quality_framework",
                    "combined security and TRUST 5 section",
                ),
                header(
                    r"(?i)^TAG\s+Chain",
                    "TRACEABILITY_SYSTEM",
                    "methodology",
                    "TAG chain traceability section",
                ),
                header(
                    r"(?i)^Research\s+TAG\s+System",
                    "TRACEABILITY_SYSTEM",
                    "methodology",
                    "research TAG system integration",
                ),
            ],
            path_patterns: vec![
                path(
                    r"\.moai/specs/SPEC-\{?[A-Z0-9_]*\}?/?[a-z._]*",
                    "SPEC_PATH_PATTERN",
                ),
                path(
                    r"\.moai/config/sections/quality\.yaml",
                    "QUALITY_CONFIG_PATH",
                ),
                path(r"\.moai/docs/", "DOCS_PATH_PATTERN"),
            ],
            skill_patterns: vec![
                skill("moai-foundation-core", "TRUST5 + SPEC-First DDD"),
                skill("moai-foundation-quality", "TRUST5 validation engine"),
                skill("moai-workflow-ddd", "DDD methodology"),
                skill("moai-workflow-tdd", "TDD methodology"),
                skill("moai-workflow-spec", "SPEC workflow"),
                skill("moai-workflow-project", "SPEC project init"),
            ],
            content_patterns: vec![
                content(
                    r"TRUST\s*5\s+quality\s+gates",
                    "QUALITY_GATE_TEXT",
                    "quality_framework",
                    "TRUST 5 quality gates reference",
                ),
                content(
                    r"TRUST\s*5\s+principles",
                    "QUALITY_PRINCIPLES_TEXT",
                    "quality_framework",
                    "TRUST 5 principles reference",
                ),
            ],
            partial_modules: vec![
                module("moai-workflow-testing", "modules/ddd"),
                module("moai-workflow-testing", "modules/ddd-context7"),
            ],
            whole_file_agents: strings(&[
                "manager-spec",
                "manager-ddd",
                "manager-tdd",
                "manager-project",
                "manager-quality",
                "team-quality",
            ]),
            whole_file_skills: strings(&[
                "moai-foundation-core",
                "moai-foundation-quality",
                "moai-workflow-ddd",
                "moai-workflow-tdd",
                "moai-workflow-spec",
                "moai-workflow-project",
            ]),
            whole_file_skill_dirs: strings(&["moai"]),
            whole_file_rules: strings(&["spec-workflow.md", "workflow-modes.md"]),
        }
    }
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<&str>) -> Result<Self> {
        // An explicit path must load; search paths fall through silently.
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(config_path)
                .with_context(|| format!("Failed to load config from {}", config_path));
        }

        if Path::new(LOCAL_CONFIG_FILE).is_file() {
            debug!("Loading config from ./{}", LOCAL_CONFIG_FILE);
            return Self::load_from_path(LOCAL_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("personasplit").join("config.toml");
            if config_path.is_file() {
                debug!("Loading config from {:?}", config_path);
                return Self::load_from_path(&config_path);
            }
        }

        debug!("Using built-in rule tables");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid config TOML")?;
        Ok(config)
    }

    /// Non-empty brand from the config file, if any.
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref().filter(|b| !b.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.brand().is_none());
        assert_eq!(config.rules.header_patterns.len(), 4);
        assert!(config
            .settings
            .persona_keys
            .contains(&"hooks".to_string()));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
brand = "do"

[rules]
whole_file_rules = ["custom.md"]
"#,
        )
        .unwrap();
        assert_eq!(config.brand(), Some("do"));
        assert_eq!(config.rules.whole_file_rules, vec!["custom.md"]);
        // untouched tables keep their defaults
        assert_eq!(config.rules.header_patterns.len(), 4);
        assert_eq!(config.settings.persona_env_keys, vec!["MOAI_CONFIG_SOURCE"]);
    }

    #[test]
    fn test_toml_rule_tables() {
        let config = Config::from_toml(
            r#"
[[rules.header_patterns]]
pattern = "(?i)^Quality Gates"
slot_id = "GATES"

[[rules.partial_modules]]
skill_name = "testing"
module_glob = "modules/bdd"

[settings]
persona_keys = ["hooks"]
"#,
        )
        .unwrap();
        assert_eq!(config.rules.header_patterns.len(), 1);
        assert_eq!(config.rules.header_patterns[0].slot_id, "GATES");
        assert!(config.rules.header_patterns[0].category.is_empty());
        assert_eq!(config.rules.partial_modules[0].module_glob, "modules/bdd");
        assert_eq!(config.settings.persona_keys, vec!["hooks"]);
        assert_eq!(config.settings.persona_env_keys, vec!["MOAI_CONFIG_SOURCE"]);
    }

    #[test]
    fn test_blank_brand_is_none() {
        let config = Config::from_toml("brand = \"  \"").unwrap();
        assert!(config.brand().is_none());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("rules = 3").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "brand = \"moai\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load_with_path(Some(&path)).unwrap();
        assert_eq!(config.brand(), Some("moai"));
    }

    #[test]
    fn test_load_missing_explicit_path_is_error() {
        let result = Config::load_with_path(Some("/nonexistent/personasplit-config.toml"));
        assert!(result.is_err());
    }
}
