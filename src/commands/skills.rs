//! Skill Commands
//!
//! `skill list | match`.

use serde::Serialize;

use crate::commands::CommandOutput;
use crate::state::AppState;
use crate::utils::error::AppResult;

#[derive(Debug, Serialize)]
struct SkillRow<'a> {
    plugin: &'a str,
    skill_id: &'a str,
    description: &'a str,
    allowed_tools: Vec<&'a str>,
}

pub fn list(state: &AppState) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let plugins = manager.installed_skills()?;

    let rows: Vec<SkillRow<'_>> = plugins
        .iter()
        .flat_map(|p| {
            p.skills.iter().map(move |s| SkillRow {
                plugin: &p.plugin,
                skill_id: s.descriptor.skill_id(),
                description: s.descriptor.trigger_description(),
                allowed_tools: s.descriptor.allowed_tools().iter().map(String::as_str).collect(),
            })
        })
        .collect();

    let text = if rows.is_empty() {
        "No skills installed.".to_string()
    } else {
        rows.iter()
            .map(|r| format!("{}:{}  {}", r.plugin, r.skill_id, r.description))
            .collect::<Vec<_>>()
            .join("\n")
    };
    CommandOutput::new(&rows, text)
}

pub fn match_task(state: &AppState, task: &str, top_k: Option<usize>, inject: bool) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let result = manager.match_task(task, top_k, inject)?;

    let text = match &result.context {
        Some(context) => context.clone(),
        None if result.matches.is_empty() => "No relevant skills.".to_string(),
        None => result
            .matches
            .iter()
            .map(|m| format!("{:.2}  {}:{}", m.score, m.plugin, m.skill.skill_id()))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    CommandOutput::new(&result, text)
}
