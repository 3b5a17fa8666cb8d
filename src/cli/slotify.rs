use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::slotifier::BrandSlotifier;

pub fn run(path: &str, brand: &str) -> Result<()> {
    print!("{}", slotify_file(path, brand)?);
    Ok(())
}

fn slotify_file(path: &str, brand: &str) -> Result<String> {
    let file = Path::new(path);
    if !file.exists() {
        bail!("File not found: {}", path);
    }
    if !file.is_file() {
        bail!("Path is not a file: {}", path);
    }
    if brand.trim().is_empty() {
        bail!("Brand must not be empty");
    }

    let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", path))?;
    Ok(BrandSlotifier::new(brand).slotify(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slotify_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Run /moai:plan then read .moai/docs/").unwrap();
        let out = slotify_file(file.path().to_str().unwrap(), "moai").unwrap();
        assert_eq!(out, "Run /{{slot:BRAND_CMD}}:plan then read .{{slot:BRAND_DIR}}/docs/");
    }

    #[test]
    fn test_slotify_missing_file() {
        let err = slotify_file("/tmp/nonexistent-slotify-xyz.md", "moai").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_slotify_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = slotify_file(dir.path().to_str().unwrap(), "moai").unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn test_slotify_blank_brand() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(slotify_file(file.path().to_str().unwrap(), " ").is_err());
    }
}
