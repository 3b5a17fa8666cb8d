//! Per-kind extractors.
//!
//! Each extractor decides, for one parsed document, what stays in core and
//! what moves to the persona manifest. The orchestrator picks the extractor
//! from the document's [`DocumentKind`].

pub mod agent;
pub mod rule;
pub mod settings;
pub mod skill;
pub mod whole_file;

pub use agent::AgentExtractor;
pub use rule::RuleExtractor;
pub use settings::{SettingsSplit, SettingsSplitter};
pub use skill::SkillExtractor;
pub use whole_file::WholeFileExtractor;

use std::fmt;

use crate::document::Document;
use crate::error::Result;
use crate::manifest::PersonaManifest;

/// What a routed file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Root directive file (`CLAUDE.md`).
    Directive,
    /// Root `settings.json`.
    Settings,
    Agent,
    Skill,
    Rule,
    Style,
    Character,
    Spinner,
    Command,
    Hook,
}

impl DocumentKind {
    /// Kind owning a top-level category directory.
    pub fn from_category(dir: &str) -> Option<Self> {
        match dir {
            "agents" => Some(Self::Agent),
            "skills" => Some(Self::Skill),
            "rules" => Some(Self::Rule),
            "styles" | "output-styles" => Some(Self::Style),
            "characters" => Some(Self::Character),
            "spinners" => Some(Self::Spinner),
            "commands" => Some(Self::Command),
            "hooks" => Some(Self::Hook),
            _ => None,
        }
    }

    /// Kinds whose files belong to the persona regardless of content.
    pub fn is_always_persona(self) -> bool {
        matches!(
            self,
            Self::Directive
                | Self::Style
                | Self::Character
                | Self::Spinner
                | Self::Command
                | Self::Hook
        )
    }

    /// Slot registry scope for documents of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directive => "directive",
            Self::Settings => "settings",
            Self::Agent => "agent",
            Self::Skill => "skill",
            Self::Rule => "rule",
            Self::Style => "style",
            Self::Character => "character",
            Self::Spinner => "spinner",
            Self::Command => "command",
            Self::Hook => "hook",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of extracting one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// `None` when the whole file is persona.
    pub core: Option<Document>,
    pub manifest: PersonaManifest,
}

impl Extraction {
    pub fn persona(manifest: PersonaManifest) -> Self {
        Self {
            core: None,
            manifest,
        }
    }

    pub fn core(doc: Document, manifest: PersonaManifest) -> Self {
        Self {
            core: Some(doc),
            manifest,
        }
    }

    pub fn is_persona(&self) -> bool {
        self.core.is_none()
    }
}

/// Splits one parsed document into its core remainder and persona manifest.
///
/// Errors are reserved for structural inconsistencies; content that matches
/// no rule is core.
pub trait Extractor {
    fn extract(&self, doc: &Document) -> Result<Extraction>;
}
