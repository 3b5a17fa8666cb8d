//! Root settings file split.
//!
//! Top-level keys are either persona (a fixed set) or core. The `env` object
//! is split per sub-key.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::SettingsConfig;
use crate::error::{Result, SplitError};

pub const SETTINGS_FILE: &str = "settings.json";
const ENV_KEY: &str = "env";

/// Both halves of a settings object. Together they hold every original key
/// exactly once; `env` may appear in both with disjoint sub-keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsSplit {
    pub core: Map<String, Value>,
    pub persona: Map<String, Value>,
}

impl SettingsSplit {
    /// Top-level keys plus `env` sub-keys, each counted in the half that
    /// holds it.
    pub fn key_counts(&self) -> (usize, usize) {
        (flat_key_count(&self.core), flat_key_count(&self.persona))
    }
}

fn flat_key_count(map: &Map<String, Value>) -> usize {
    map.iter()
        .map(|(key, value)| match (key.as_str(), value) {
            (ENV_KEY, Value::Object(env)) => env.len(),
            _ => 1,
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct SettingsSplitter {
    persona_keys: HashSet<String>,
    persona_env_keys: HashSet<String>,
}

impl Default for SettingsSplitter {
    fn default() -> Self {
        Self::new(&SettingsConfig::default())
    }
}

impl SettingsSplitter {
    pub fn new(config: &SettingsConfig) -> Self {
        Self {
            persona_keys: config.persona_keys.iter().cloned().collect(),
            persona_env_keys: config.persona_env_keys.iter().cloned().collect(),
        }
    }

    /// Parses `content` as a JSON object and splits it.
    pub fn split_str(&self, content: &str, path: &str) -> Result<SettingsSplit> {
        let settings: Map<String, Value> =
            serde_json::from_str(content).map_err(|source| SplitError::MalformedSettings {
                path: path.to_string(),
                source,
            })?;
        let split = self.split(settings);
        debug!(
            path,
            core = split.core.len(),
            persona = split.persona.len(),
            "split settings"
        );
        Ok(split)
    }

    pub fn split(&self, settings: Map<String, Value>) -> SettingsSplit {
        let mut out = SettingsSplit::default();
        for (key, value) in settings {
            if self.persona_keys.contains(&key) {
                out.persona.insert(key, value);
                continue;
            }
            if key != ENV_KEY {
                out.core.insert(key, value);
                continue;
            }

            let Value::Object(env) = value else {
                // Not an object: nothing to split.
                out.core.insert(key, value);
                continue;
            };
            let (persona_env, core_env): (Map<String, Value>, Map<String, Value>) = env
                .into_iter()
                .partition(|(name, _)| self.persona_env_keys.contains(name));
            // an empty env still belongs to core
            if !core_env.is_empty() || persona_env.is_empty() {
                out.core.insert(ENV_KEY.to_string(), Value::Object(core_env));
            }
            if !persona_env.is_empty() {
                out.persona
                    .insert(ENV_KEY.to_string(), Value::Object(persona_env));
            }
        }
        out
    }
}
