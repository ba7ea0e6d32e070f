//! Recorded OCR frames: either JSON (`[[{text, bounding_box?, confidence?}]]`)
//! or plain text with frames separated by `---` lines.

use std::path::Path;

use anyhow::{Context, Result};
use tipjar_ocr::TextObservation;

pub type Frame = Vec<TextObservation>;

pub fn load(path: &Path) -> Result<Vec<Frame>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"))
        || content.trim_start().starts_with('[');
    if is_json {
        parse_json(&content).with_context(|| format!("Invalid frame JSON in {}", path.display()))
    } else {
        Ok(parse_text(&content))
    }
}

pub fn parse_json(content: &str) -> Result<Vec<Frame>> {
    Ok(serde_json::from_str(content)?)
}

pub fn parse_text(content: &str) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut current = String::new();
    for line in content.lines() {
        if line.trim() == "---" {
            frames.push(TextObservation::from_lines(&current));
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    frames.push(TextObservation::from_lines(&current));
    frames.retain(|f| !f.is_empty());
    frames
}
