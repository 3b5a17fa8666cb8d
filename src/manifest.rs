//! The persona manifest: everything a run moved out of core.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Skill list edits for one agent. Lists keep encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    pub append_skills: Vec<String>,
    pub remove_skills: Vec<String>,
}

impl AgentPatch {
    pub fn is_empty(&self) -> bool {
        self.append_skills.is_empty() && self.remove_skills.is_empty()
    }

    fn extend(&mut self, other: AgentPatch) {
        self.append_skills.extend(other.append_skills);
        self.remove_skills.extend(other.remove_skills);
    }
}

/// Accumulated persona output of a run.
///
/// Per-file extractions each produce a small manifest; the orchestrator folds
/// them together with [`PersonaManifest::merge`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaManifest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brand: String,
    /// Relative path of the root directive file.
    #[serde(rename = "claudeMD", default, skip_serializing_if = "String::is_empty")]
    pub claude_md: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_dir: String,

    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub spinners: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub hook_scripts: Vec<String>,
    /// Relative paths of files that stay in core.
    #[serde(default)]
    pub core_files: Vec<String>,

    /// Slot id -> original persona text.
    #[serde(default)]
    pub slot_content: BTreeMap<String, String>,
    /// Agent path -> skill list edits.
    #[serde(default)]
    pub agent_patches: BTreeMap<String, AgentPatch>,
    /// Relative path -> absolute path of every persona file.
    #[serde(default)]
    pub persona_files: BTreeMap<String, String>,
    /// Persona half of the root settings file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skill_mappings: BTreeMap<String, String>,
}

impl PersonaManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `other` into `self`.
    ///
    /// Scalars keep the first non-empty value, lists are concatenated, map
    /// entries are overwritten, and agent patches for the same path are
    /// concatenated.
    pub fn merge(&mut self, other: PersonaManifest) {
        first_non_empty(&mut self.name, other.name);
        first_non_empty(&mut self.brand, other.brand);
        first_non_empty(&mut self.claude_md, other.claude_md);
        first_non_empty(&mut self.source_dir, other.source_dir);

        self.agents.extend(other.agents);
        self.skills.extend(other.skills);
        self.rules.extend(other.rules);
        self.styles.extend(other.styles);
        self.characters.extend(other.characters);
        self.spinners.extend(other.spinners);
        self.commands.extend(other.commands);
        self.hook_scripts.extend(other.hook_scripts);
        self.core_files.extend(other.core_files);

        self.slot_content.extend(other.slot_content);
        self.persona_files.extend(other.persona_files);
        self.settings.extend(other.settings);
        self.skill_mappings.extend(other.skill_mappings);

        for (path, patch) in other.agent_patches {
            self.agent_patches.entry(path).or_default().extend(patch);
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn first_non_empty(dst: &mut String, src: String) {
    if dst.is_empty() && !src.is_empty() {
        *dst = src;
    }
}
