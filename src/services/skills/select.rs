//! Skill Selection
//!
//! Bridges installed plugins to the core matcher: flattens every plugin's
//! skills into match candidates and applies the configured threshold and
//! result budget.

use skillmart_core::{MatchCandidate, SkillMatch, SkillMatcher};

use crate::models::settings::MatcherSettings;
use crate::services::skills::discovery::DiscoveredSkill;

/// Skills of one installed plugin, as offered to the matcher.
#[derive(Debug, Clone)]
pub struct PluginSkills {
    pub plugin: String,
    /// Unix seconds of the last install or update
    pub installed_at: i64,
    pub skills: Vec<DiscoveredSkill>,
}

/// Build a matcher from settings. `top_k` overrides `settings.top_k` when given.
pub fn build_matcher(settings: &MatcherSettings, top_k: Option<usize>) -> SkillMatcher {
    SkillMatcher::default()
        .with_min_score(settings.min_score)
        .with_max_results(top_k.unwrap_or(settings.top_k))
}

/// Rank every installed skill against `task`.
pub fn select_skills(task: &str, plugins: &[PluginSkills], matcher: &SkillMatcher) -> Vec<SkillMatch> {
    let candidates: Vec<MatchCandidate<'_>> = plugins
        .iter()
        .flat_map(|p| {
            p.skills.iter().map(move |s| MatchCandidate {
                plugin: &p.plugin,
                installed_at: p.installed_at,
                skill: &s.descriptor,
            })
        })
        .collect();

    let matches = matcher.match_skills(task, &candidates);
    tracing::debug!(
        scorer = matcher.scorer_name(),
        candidates = candidates.len(),
        matched = matches.len(),
        "skill selection"
    );
    matches
}
