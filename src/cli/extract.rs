use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::config::Config;
use crate::orchestrator::{Orchestrator, SplitOutput};
use crate::slotifier::BrandSlotifier;

pub fn run(
    source: &str,
    config_path: Option<&str>,
    brand: Option<String>,
    json: bool,
) -> Result<()> {
    let dir = Path::new(source);
    if !dir.exists() {
        bail!("Source directory not found: {}", source);
    }
    if !dir.is_dir() {
        bail!("Source path is not a directory: {}", source);
    }

    let mut config = Config::load_with_path(config_path)?;
    if let Some(brand) = brand {
        config.brand = Some(brand);
    }

    let orchestrator = Orchestrator::new(&config).context("Invalid rule configuration")?;
    let output = orchestrator
        .extract(dir)
        .with_context(|| format!("Extraction failed for {}", source))?;

    if json {
        let body = json!({
            "manifest": output.manifest,
            "registry": output.registry,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_summary(&output));
    }
    Ok(())
}

/// Human-readable summary of a run.
pub fn render_summary(output: &SplitOutput) -> String {
    let manifest = &output.manifest;
    let mut out = String::new();

    let name = if manifest.name.is_empty() {
        "(not inferred)"
    } else {
        manifest.name.as_str()
    };
    let _ = writeln!(out, "Persona: {}", name);
    let _ = writeln!(out, "Source:  {}", manifest.source_dir);
    if !manifest.claude_md.is_empty() {
        let _ = writeln!(out, "Directive: {}", manifest.claude_md);
    }

    let _ = writeln!(out, "\nPersona files:");
    for (label, list) in [
        ("agents", &manifest.agents),
        ("skills", &manifest.skills),
        ("rules", &manifest.rules),
        ("styles", &manifest.styles),
        ("characters", &manifest.characters),
        ("spinners", &manifest.spinners),
        ("commands", &manifest.commands),
        ("hook scripts", &manifest.hook_scripts),
    ] {
        let _ = writeln!(out, "  {:<13}{}", label, list.len());
    }
    let _ = writeln!(out, "  {:<13}{}", "agent patches", manifest.agent_patches.len());
    let _ = writeln!(out, "  {:<13}{}", "settings", manifest.settings.len());

    let _ = writeln!(out, "\nSlots ({}):", output.registry.len());
    for id in output.registry.ids() {
        let _ = writeln!(out, "  {}", id);
    }

    let slotifier = BrandSlotifier::new(&manifest.brand);
    let _ = writeln!(out, "\nCore files ({}):", manifest.core_files.len());
    for path in &manifest.core_files {
        let remapped = slotifier.remap_core_path(&slotifier.strip_brand_subdir(path));
        if remapped == *path {
            let _ = writeln!(out, "  {}", path);
        } else {
            let _ = writeln!(out, "  {} -> {}", path, remapped);
        }
    }
    out
}
