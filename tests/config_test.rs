//! Configuration loading and its effect on classification
//! Tests config files, overrides, and rule compilation

use anyhow::Result;
use personasplit::config::Config;
use personasplit::orchestrator::Orchestrator;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert!(config.brand().is_none());
    assert!(!config.rules.header_patterns.is_empty());
    assert!(!config.rules.content_patterns.is_empty());
    assert!(config
        .rules
        .whole_file_agents
        .contains(&"manager-spec".to_string()));
    assert!(!config.settings.persona_keys.is_empty());

    Ok(())
}

#[test]
fn test_load_from_explicit_path() -> Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("personasplit.toml");
    fs::write(
        &path,
        r#"
brand = "acme"

[settings]
persona_keys = ["statusLine"]
"#,
    )?;

    let config = Config::load_with_path(path.to_str())?;
    assert_eq!(config.brand(), Some("acme"));
    assert_eq!(config.settings.persona_keys, vec!["statusLine"]);
    // untouched tables keep their defaults
    assert_eq!(config.rules, Config::default().rules);

    Ok(())
}

#[test]
fn test_missing_explicit_path_is_error() {
    let result = Config::load_with_path(Some("/tmp/personasplit-missing-config-xyz.toml"));
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load config"));
}

#[test]
fn test_invalid_toml_is_error() -> Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("bad.toml");
    fs::write(&path, "brand = [unclosed")?;
    assert!(Config::load_with_path(path.to_str()).is_err());
    Ok(())
}

#[test]
fn test_blank_brand_is_ignored() -> Result<()> {
    let config = Config::from_toml("brand = \"  \"")?;
    assert!(config.brand().is_none());
    Ok(())
}

#[test]
fn test_custom_header_rule_drives_extraction() -> Result<()> {
    let config = Config::from_toml(
        r#"
[[rules.header_patterns]]
pattern = "(?i)^Mission"
slot_id = "MISSION_STATEMENT"
category = "identity"
description = "persona mission"
"#,
    )?;
    // replacing the table drops the built-in header rules
    assert_eq!(config.rules.header_patterns.len(), 1);

    let tmp = TempDir::new()?;
    let agents = tmp.path().join("agents");
    fs::create_dir_all(&agents)?;
    fs::write(
        agents.join("scout.md"),
        "# Scout\n\n## Mission\nFind things.\n\n## TRUST 5 Compliance\nkept\n",
    )?;

    let output = Orchestrator::new(&config)?.extract(tmp.path())?;
    assert_eq!(
        output.manifest.slot_content["MISSION_STATEMENT"],
        "## Mission\nFind things.\n"
    );
    assert!(!output.manifest.slot_content.contains_key("QUALITY_FRAMEWORK"));

    let entry = output.registry.get("MISSION_STATEMENT").unwrap();
    assert_eq!(entry.category, "section");
    assert_eq!(entry.scope, "agent");

    Ok(())
}

#[test]
fn test_custom_settings_keys_drive_split() -> Result<()> {
    let config = Config::from_toml(
        r#"
[settings]
persona_keys = ["statusLine"]
persona_env_keys = ["ACME_MODE"]
"#,
    )?;

    let tmp = TempDir::new()?;
    fs::write(
        tmp.path().join("settings.json"),
        r#"{"statusLine": {}, "hooks": {}, "env": {"ACME_MODE": "1", "PATH_X": "2"}}"#,
    )?;

    let output = Orchestrator::new(&config)?.extract(tmp.path())?;
    let persona = &output.manifest.settings;
    assert!(persona.contains_key("statusLine"));
    assert!(!persona.contains_key("hooks"));
    assert_eq!(persona["env"], serde_json::json!({"ACME_MODE": "1"}));

    let core = output.core_settings.unwrap();
    assert!(core.contains_key("hooks"));
    assert_eq!(core["env"], serde_json::json!({"PATH_X": "2"}));

    Ok(())
}

#[test]
fn test_unrecoverable_slot_id_rejected_before_extraction() -> Result<()> {
    let config = Config::from_toml(
        r#"
[[rules.header_patterns]]
pattern = "(?i)^Quality Gates"
slot_id = "quality-gates"
"#,
    )?;

    let err = Orchestrator::new(&config).err().unwrap();
    let message = err.to_string();
    assert!(message.contains("slot"));
    assert!(message.contains("quality-gates"));

    Ok(())
}
