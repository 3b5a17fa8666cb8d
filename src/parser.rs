//! Markdown + YAML frontmatter parser.
//!
//! The pipeline only depends on [`DocumentParser`]; `MarkdownParser` is the
//! implementation the orchestrator uses by default.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::document::{Document, Frontmatter, Section};
use crate::error::{Result, SplitError};

const FRONTMATTER_DELIMITER: &str = "---";

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

/// Turns file content into a [`Document`].
///
/// Implementations must strip header markers from `Section::title` and
/// report 1-based line numbers; header classification relies on both.
pub trait DocumentParser {
    fn parse(&self, content: &str, path: &str) -> Result<Document>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for MarkdownParser {
    fn parse(&self, content: &str, path: &str) -> Result<Document> {
        let (frontmatter, body) = match split_frontmatter(content) {
            Some((yaml, body)) => {
                let raw = parse_frontmatter_yaml(yaml)
                    .map_err(|e| SplitError::parse(path, format!("invalid frontmatter: {}", e)))?;
                (Some(Frontmatter::from_raw(raw)), body)
            }
            None => (None, content),
        };

        Ok(Document {
            path: path.to_string(),
            frontmatter,
            sections: parse_sections(body),
            raw_content: content.to_string(),
        })
    }
}

/// Splits leading `---` delimited YAML from the body.
///
/// Returns `None` when the first line is not a delimiter or the block is
/// never closed; the whole content is then body.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != FRONTMATTER_DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim() == FRONTMATTER_DELIMITER {
            let body_start = offset + line.len();
            return Some((&content[yaml_start..offset], &content[body_start..]));
        }
        offset += line.len();
    }
    None
}

fn parse_frontmatter_yaml(
    yaml: &str,
) -> std::result::Result<BTreeMap<String, Value>, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(yaml)
}

/// Builds the section tree for a markdown body.
///
/// Headers inside fenced code blocks are ignored. Text before the first
/// header becomes a level-0 section that is always a root.
pub fn parse_sections(body: &str) -> Vec<Section> {
    if body.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let mut flat = Vec::new();
    let mut in_code_block = false;

    let mut level = 0;
    let mut title = String::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 1;

    for (idx, &line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_block = !in_code_block;
            current.push(line);
            continue;
        }
        if in_code_block {
            current.push(line);
            continue;
        }

        if let Some(caps) = HEADER_RE.captures(line) {
            if !current.is_empty() || level > 0 {
                flat.push(
                    Section::new(level, std::mem::take(&mut title), current.join("\n"))
                        .with_lines(start, line_num),
                );
            }
            level = caps[1].len();
            title = caps[2].trim().to_string();
            current = vec![line];
            start = line_num;
            continue;
        }

        current.push(line);
    }

    if !current.is_empty() || level > 0 {
        flat.push(
            Section::new(level, title, current.join("\n")).with_lines(start, lines.len() + 1),
        );
    }

    nest_sections(flat)
}

/// Stack-based nesting: each section becomes a child of the nearest
/// preceding section with a strictly lower level.
fn nest_sections(flat: Vec<Section>) -> Vec<Section> {
    let mut roots: Vec<Section> = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    for section in flat {
        if section.level == 0 {
            close_until(&mut stack, &mut roots, 0);
            roots.push(section);
            continue;
        }
        close_until(&mut stack, &mut roots, section.level);
        stack.push(section);
    }
    close_until(&mut stack, &mut roots, 0);
    roots
}

/// Pops every open section whose level is `>= level`, attaching each to its
/// parent on the stack or to `roots`.
fn close_until(stack: &mut Vec<Section>, roots: &mut Vec<Section>, level: usize) {
    while stack.last().is_some_and(|top| top.level >= level) {
        let Some(done) = stack.pop() else { break };
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}
