//! Skill Discovery
//!
//! Finds the skill files of one plugin directory and validates its declared
//! capability layout.
//!
//! Within the skills directory two shapes are recognised:
//! - `<skills>/<skill-name>/SKILL.md`
//! - `<skills>/<file>.md` (README.md excluded)
//!
//! Entries are visited in sorted order so discovery output is stable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use skillmart_core::SkillDescriptor;

use crate::services::plugins::models::{CapabilityKind, CapabilitySpec, PluginManifest};
use crate::services::skills::parser::validate_skill_descriptor;
use crate::utils::error::{AppError, AppResult};

/// Loose Markdown files in a skills directory that are documentation, not skills.
const IGNORED_FILES: &[&str] = &["README.md", "readme.md", "CHANGELOG.md"];

/// A validated skill together with the file it came from.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredSkill {
    pub path: PathBuf,
    pub descriptor: SkillDescriptor,
}

/// Check that every capability directory the manifest declares exists.
pub fn verify_layout(plugin_dir: &Path, manifest: &PluginManifest) -> AppResult<()> {
    for (kind, spec) in &manifest.capabilities {
        let dir = plugin_dir.join(spec.dir(*kind));
        if !dir.is_dir() {
            return Err(AppError::invalid_manifest(
                plugin_dir.display(),
                format!(
                    "plugin '{}' declares {} at '{}' but the directory does not exist",
                    manifest.name,
                    kind,
                    spec.dir(*kind)
                ),
            ));
        }
    }
    Ok(())
}

/// Directory scanned for skills, if any.
///
/// A declared `skills` capability is used as-is (`auto_discover: false`
/// turns discovery off). Without a declaration the conventional `skills/`
/// directory is still picked up when present.
pub fn skills_dir(plugin_dir: &Path, manifest: &PluginManifest) -> Option<PathBuf> {
    match manifest.capability(CapabilityKind::Skills) {
        Some(spec) if !spec.auto_discover => None,
        Some(spec) => Some(plugin_dir.join(spec.dir(CapabilityKind::Skills))),
        None => {
            let default = plugin_dir.join(CapabilitySpec::default().dir(CapabilityKind::Skills));
            default.is_dir().then_some(default)
        }
    }
}

/// Discover and validate all skills of a plugin.
///
/// Any invalid skill file fails the whole plugin; duplicate skill ids are
/// reported as `InvalidSkillFormat`.
pub fn discover_skills(plugin_dir: &Path, manifest: &PluginManifest) -> AppResult<Vec<DiscoveredSkill>> {
    let Some(dir) = skills_dir(plugin_dir, manifest) else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut skills = Vec::new();
    let mut seen = HashSet::new();
    for path in find_skill_files(&dir)? {
        let descriptor = validate_skill_descriptor(&path)?;
        if !seen.insert(descriptor.skill_id().to_string()) {
            return Err(AppError::invalid_skill(
                path.display(),
                format!(
                    "skill id '{}' is used more than once in plugin '{}'",
                    descriptor.skill_id(),
                    manifest.name
                ),
            ));
        }
        skills.push(DiscoveredSkill { path, descriptor });
    }
    Ok(skills)
}

/// Skill files directly under `dir`, sorted by path.
fn find_skill_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            let skill_md = path.join("SKILL.md");
            if skill_md.is_file() {
                files.push(skill_md);
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !IGNORED_FILES.contains(&name) {
                files.push(path);
            }
        }
    }
    Ok(files)
}
