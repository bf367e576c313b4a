//! Relevance Scoring
//!
//! `RelevanceScorer` is the pluggable strategy the matcher uses to rate a
//! skill against a task. `LexicalScorer` is the built-in bag-of-terms
//! implementation; an embedding-backed scorer can be dropped in behind the
//! same trait.

use std::collections::BTreeSet;

use crate::skill::SkillDescriptor;
use crate::text::{bigrams, term_set, terms};

/// A task description, tokenized once and scored against many skills.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    terms: BTreeSet<String>,
    bigrams: BTreeSet<(String, String)>,
}

impl Query {
    pub fn new(text: &str) -> Self {
        let ordered = terms(text);
        Self {
            text: text.to_string(),
            bigrams: bigrams(&ordered),
            terms: ordered.into_iter().collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct normalized terms of the task.
    pub fn terms(&self) -> &BTreeSet<String> {
        &self.terms
    }

    pub fn bigrams(&self) -> &BTreeSet<(String, String)> {
        &self.bigrams
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Strategy for rating how relevant a skill is to a task.
///
/// Implementations must be pure: the same query and skill always yield the
/// same score. Higher is more relevant; `0.0` means unrelated.
pub trait RelevanceScorer: Send + Sync {
    /// Short identifier used in logs and CLI output.
    fn name(&self) -> &str;

    fn score(&self, query: &Query, skill: &SkillDescriptor) -> f32;
}

/// Weighted term-overlap scorer.
///
/// score = (sum of per-term weights + phrase bonus) / distinct query terms
///
/// - query term found in the skill id:          `name_weight`
/// - otherwise found in the trigger description: `description_weight`
/// - each query bigram also present in the description: `phrase_weight`
///
/// A skill whose trigger description shares no term with the task scores
/// `0.0`; a name match alone never activates it.
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    pub name_weight: f32,
    pub description_weight: f32,
    pub phrase_weight: f32,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self {
            name_weight: 1.5,
            description_weight: 1.0,
            phrase_weight: 0.5,
        }
    }
}

impl RelevanceScorer for LexicalScorer {
    fn name(&self) -> &str {
        "lexical"
    }

    fn score(&self, query: &Query, skill: &SkillDescriptor) -> f32 {
        if query.is_empty() {
            return 0.0;
        }

        let name_terms = term_set(skill.skill_id());
        let desc_ordered = terms(skill.trigger_description());
        let desc_bigrams = bigrams(&desc_ordered);
        let desc_terms: BTreeSet<String> = desc_ordered.into_iter().collect();

        if !query.terms().iter().any(|t| desc_terms.contains(t)) {
            return 0.0;
        }

        let mut total = 0.0_f32;
        for term in query.terms() {
            if name_terms.contains(term) {
                total += self.name_weight;
            } else if desc_terms.contains(term) {
                total += self.description_weight;
            }
        }

        let phrase_hits = query
            .bigrams()
            .iter()
            .filter(|b| desc_bigrams.contains(*b))
            .count();
        total += phrase_hits as f32 * self.phrase_weight;

        total / query.terms().len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str, description: &str) -> SkillDescriptor {
        SkillDescriptor::new(id, description, Vec::new(), "").unwrap()
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let scorer = LexicalScorer::default();
        let s = skill("react", "React components");
        assert_eq!(scorer.score(&Query::new("the a of"), &s), 0.0);
    }

    #[test]
    fn test_unrelated_scores_zero() {
        let scorer = LexicalScorer::default();
        let s = skill("strapi-plugin-dev", "Strapi v5 plugin development");
        assert_eq!(scorer.score(&Query::new("tailwind colors"), &s), 0.0);
    }

    #[test]
    fn test_name_hit_outweighs_description_hit() {
        let scorer = LexicalScorer::default();
        let by_name = skill("typography", "Fonts and type scales");
        let by_desc = skill("fonts", "Typography and type scales");
        let q = Query::new("typography scales");
        assert!(scorer.score(&q, &by_name) > scorer.score(&q, &by_desc));
    }

    #[test]
    fn test_name_hit_alone_scores_zero() {
        let scorer = LexicalScorer::default();
        let s = skill("refactoring-ui", "Practical UI design guidance for React components");
        let q = Query::new("refactor the Strapi plugin controller");
        assert_eq!(scorer.score(&q, &s), 0.0);
    }

    #[test]
    fn test_phrase_bonus() {
        let scorer = LexicalScorer::default();
        let phrase = skill("a", "visual hierarchy guidance");
        let scattered = skill("b", "hierarchy of visual guidance");
        let q = Query::new("visual hierarchy");
        assert!(scorer.score(&q, &phrase) > scorer.score(&q, &scattered));
    }

    #[test]
    fn test_full_overlap_is_one() {
        let scorer = LexicalScorer::default();
        let s = skill("x", "button spacing");
        let q = Query::new("spacing");
        assert!((scorer.score(&q, &s) - 1.0).abs() < f32::EPSILON);
    }
}
