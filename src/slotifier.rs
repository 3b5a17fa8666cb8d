//! Brand neutralization for core content.
//!
//! Brand literals are rewritten to placeholders in a fixed order, each rule
//! running on the output of the previous one:
//!
//! | Input          | Output                   |
//! |----------------|--------------------------|
//! | `/moai:`       | `/{{slot:BRAND_CMD}}:`   |
//! | `/moai `       | `/{{slot:BRAND_CMD}} `   |
//! | `.moai/`       | `.{{slot:BRAND_DIR}}/`   |
//! | `moai-x`       | `{{slot:BRAND}}-x`       |
//! | `MoAI` (word)  | `{{slot:BRAND}}`         |
//!
//! Placeholders contain no brand text, so a second pass is a no-op.

use regex::{Captures, Regex};

pub const BRAND_SLOT: &str = "{{slot:BRAND}}";
pub const BRAND_CMD_SLOT: &str = "{{slot:BRAND_CMD}}";
pub const BRAND_DIR_SLOT: &str = "{{slot:BRAND_DIR}}";

/// Categories whose files may sit under a brand-named subdirectory.
const BRAND_SUBDIR_CATEGORIES: &[&str] = &[
    "agents",
    "rules",
    "commands",
    "hooks",
    "output-styles",
    "skills",
];

#[derive(Debug, Clone)]
struct BrandRules {
    brand: String,
    prefixed_identifier: Regex,
    /// Matches existing placeholders or the bare brand word. Placeholders
    /// are passed through untouched.
    catch_all: Regex,
}

/// Rewrites brand literals into placeholder slots.
///
/// Built with an empty brand it leaves everything unchanged.
#[derive(Debug, Clone)]
pub struct BrandSlotifier {
    rules: Option<BrandRules>,
}

impl BrandSlotifier {
    pub fn new(brand: &str) -> Self {
        let brand = brand.trim();
        if brand.is_empty() {
            return Self::disabled();
        }
        let quoted = regex::escape(brand);
        // Escaped input always forms a valid pattern.
        let rules = Regex::new(&format!(r"\b{}-([a-z])", quoted))
            .and_then(|prefixed_identifier| {
                let catch_all = Regex::new(&format!(
                    r"\{{\{{slot:[A-Z][A-Z0-9_]*\}}\}}|(?i:\b{}\b)",
                    quoted
                ))?;
                Ok(BrandRules {
                    brand: brand.to_string(),
                    prefixed_identifier,
                    catch_all,
                })
            })
            .ok();
        Self { rules }
    }

    pub fn disabled() -> Self {
        Self { rules: None }
    }

    pub fn brand(&self) -> Option<&str> {
        self.rules.as_ref().map(|r| r.brand.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.rules.is_some()
    }

    pub fn slotify(&self, content: &str) -> String {
        let Some(rules) = &self.rules else {
            return content.to_string();
        };
        let brand = &rules.brand;

        let out = content.replace(&format!("/{}:", brand), &format!("/{}:", BRAND_CMD_SLOT));
        let out = out.replace(&format!("/{} ", brand), &format!("/{} ", BRAND_CMD_SLOT));
        let out = out.replace(&format!(".{}/", brand), &format!(".{}/", BRAND_DIR_SLOT));
        let out = rules
            .prefixed_identifier
            .replace_all(&out, format!("{}-$1", BRAND_SLOT).as_str());
        rules
            .catch_all
            .replace_all(&out, |caps: &Captures<'_>| {
                let matched = &caps[0];
                if matched.starts_with("{{") {
                    matched.to_string()
                } else {
                    BRAND_SLOT.to_string()
                }
            })
            .into_owned()
    }

    /// `moai-lang-python` -> `lang-python`.
    pub fn strip_brand_prefix<'a>(&self, dir_name: &'a str) -> &'a str {
        let Some(brand) = self.brand() else {
            return dir_name;
        };
        dir_name
            .strip_prefix(brand)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(dir_name)
    }

    /// Strips the brand prefix from the skill directory of a
    /// `skills/<dir>/...` path. Other paths are returned unchanged.
    pub fn remap_core_path(&self, rel_path: &str) -> String {
        let parts: Vec<&str> = rel_path.split('/').collect();
        if parts.len() < 3 || parts[0] != "skills" {
            return rel_path.to_string();
        }
        let stripped = self.strip_brand_prefix(parts[1]);
        if stripped == parts[1] {
            return rel_path.to_string();
        }
        let mut out = parts;
        out[1] = stripped;
        out.join("/")
    }

    /// `agents/moai/x.md` -> `agents/x.md` for categories that nest files
    /// under a brand directory.
    pub fn strip_brand_subdir(&self, rel_path: &str) -> String {
        let Some(brand) = self.brand() else {
            return rel_path.to_string();
        };
        let parts: Vec<&str> = rel_path.split('/').collect();
        if parts.len() < 3 || !BRAND_SUBDIR_CATEGORIES.contains(&parts[0]) || parts[1] != brand {
            return rel_path.to_string();
        }
        std::iter::once(parts[0])
            .chain(parts[2..].iter().copied())
            .collect::<Vec<_>>()
            .join("/")
    }
}
