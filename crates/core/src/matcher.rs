//! Skill Matcher
//!
//! Ranks installed skills against a task description and returns the ones
//! that clear the relevance threshold, most relevant first.
//!
//! Ordering is total and deterministic:
//! 1. score (descending)
//! 2. specificity: distinct terms in the trigger description (descending)
//! 3. install recency (most recent first)
//! 4. plugin name, then skill id (ascending)
//!
//! Returning an empty list is the normal "nothing relevant" outcome.

use std::cmp::Ordering;

use serde::Serialize;

use crate::scorer::{LexicalScorer, Query, RelevanceScorer};
use crate::skill::SkillDescriptor;
use crate::text::term_set;

/// Default minimum score a skill must reach to be activated.
pub const DEFAULT_MIN_SCORE: f32 = 0.2;

/// A skill offered to the matcher together with its owning plugin.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub plugin: &'a str,
    /// Unix seconds of the owning plugin's last install or update
    pub installed_at: i64,
    pub skill: &'a SkillDescriptor,
}

/// A skill selected for a task.
#[derive(Debug, Clone, Serialize)]
pub struct SkillMatch {
    pub plugin: String,
    pub score: f32,
    pub specificity: usize,
    pub installed_at: i64,
    pub skill: SkillDescriptor,
}

/// Deterministic, threshold-gated skill selection over a pluggable scorer.
pub struct SkillMatcher {
    scorer: Box<dyn RelevanceScorer>,
    min_score: f32,
    max_results: Option<usize>,
}

impl std::fmt::Debug for SkillMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillMatcher")
            .field("scorer", &self.scorer.name())
            .field("min_score", &self.min_score)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(LexicalScorer::default())
    }
}

impl SkillMatcher {
    pub fn new(scorer: impl RelevanceScorer + 'static) -> Self {
        Self {
            scorer: Box::new(scorer),
            min_score: DEFAULT_MIN_SCORE,
            max_results: None,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Cap the number of returned matches. `0` means no cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = (max_results > 0).then_some(max_results);
        self
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Select the skills relevant to `task`, most relevant first.
    pub fn match_skills(&self, task: &str, candidates: &[MatchCandidate<'_>]) -> Vec<SkillMatch> {
        let query = Query::new(task);
        if query.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<SkillMatch> = candidates
            .iter()
            .filter_map(|c| {
                let score = self.scorer.score(&query, c.skill);
                if !score.is_finite() || score <= 0.0 || score < self.min_score {
                    return None;
                }
                Some(SkillMatch {
                    plugin: c.plugin.to_string(),
                    score,
                    specificity: specificity(c.skill),
                    installed_at: c.installed_at,
                    skill: c.skill.clone(),
                })
            })
            .collect();

        matches.sort_by(compare_matches);

        if let Some(limit) = self.max_results {
            matches.truncate(limit);
        }
        matches
    }
}

/// Number of distinct normalized terms in the trigger description.
pub fn specificity(skill: &SkillDescriptor) -> usize {
    term_set(skill.trigger_description()).len()
}

/// Total order used to rank matches.
pub fn compare_matches(a: &SkillMatch, b: &SkillMatch) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.specificity.cmp(&a.specificity))
        .then_with(|| b.installed_at.cmp(&a.installed_at))
        .then_with(|| a.plugin.cmp(&b.plugin))
        .then_with(|| a.skill.skill_id().cmp(b.skill.skill_id()))
}
