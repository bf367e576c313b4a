//! SKILL.md Parser
//!
//! Skill files are Markdown with a YAML front matter block:
//!
//! ```text
//! ---
//! name: refactoring-ui
//! description: Use when styling React components, buttons or layout
//! allowed-tools: Read, Edit
//! ---
//! # Body
//! ...
//! ```
//!
//! `description` is the trigger description the matcher scores against and
//! is mandatory. `allowed-tools` may be a comma-separated string or a list.

use std::path::Path;

use serde::Deserialize;
use skillmart_core::SkillDescriptor;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FrontMatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "allowed_tools")]
    allowed_tools: Option<ToolList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolList {
    Csv(String),
    List(Vec<String>),
}

impl ToolList {
    fn into_tools(self) -> Vec<String> {
        match self {
            Self::Csv(s) => s
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Self::List(v) => v,
        }
    }
}

/// Read and validate a skill file.
///
/// The skill id comes from the front matter `name`, falling back to the
/// enclosing directory for `<dir>/SKILL.md` and to the file stem otherwise.
pub fn validate_skill_descriptor(path: &Path) -> AppResult<SkillDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => AppError::invalid_skill(path.display(), "not valid UTF-8"),
        _ => AppError::Io(e),
    })?;
    parse_skill_file(path, &content)
}

/// Parse skill file content. `path` is used for the fallback id and in errors.
pub fn parse_skill_file(path: &Path, content: &str) -> AppResult<SkillDescriptor> {
    let (front, body) = extract_frontmatter(path, content)?;

    let front: FrontMatter = match front {
        Some(text) if !text.trim().is_empty() => serde_yaml::from_str(&text)
            .map_err(|e| AppError::invalid_skill(path.display(), e.to_string()))?,
        _ => FrontMatter::default(),
    };

    let description = front
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::MissingTriggerDescription {
            path: path.display().to_string(),
        })?;

    let skill_id = front
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_id(path));

    let tools = front
        .allowed_tools
        .map(ToolList::into_tools)
        .unwrap_or_default();

    SkillDescriptor::new(skill_id, description, tools, body).map_err(|e| match e {
        skillmart_core::CoreError::MissingTriggerDescription { .. } => {
            AppError::MissingTriggerDescription {
                path: path.display().to_string(),
            }
        }
        other => AppError::invalid_skill(path.display(), other.to_string()),
    })
}

fn fallback_id(path: &Path) -> String {
    let is_skill_md = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case("SKILL.md"));
    let source = if is_skill_md {
        path.parent().and_then(|p| p.file_name())
    } else {
        path.file_stem()
    };
    source
        .and_then(|s| s.to_str())
        .unwrap_or("skill")
        .to_string()
}

/// Split `---` front matter from the body.
/// Returns (Some(front_matter), body) or (None, full_content). An opening
/// delimiter without a closing one is a format error.
fn extract_frontmatter(path: &Path, content: &str) -> AppResult<(Option<String>, String)> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, content.to_string()));
    }

    let after_open = trimmed[3..].trim_start_matches('-');
    let after_open = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);

    match find_closing_delimiter(after_open) {
        Some(close_pos) => {
            let front = after_open[..close_pos].to_string();
            let body = after_open[close_pos..]
                .lines()
                .skip(1)
                .collect::<Vec<_>>()
                .join("\n");
            Ok((Some(front), body.trim_start_matches('\n').to_string()))
        }
        None => Err(AppError::invalid_skill(
            path.display(),
            "front matter opened with '---' is never closed",
        )),
    }
}

/// Byte offset of the closing `---` line.
fn find_closing_delimiter(text: &str) -> Option<usize> {
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
            return Some(pos);
        }
        pos += line.len();
    }
    None
}
