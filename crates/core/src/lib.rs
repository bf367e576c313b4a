//! Skillmart Core
//!
//! Skill descriptors and the skill-activation engine for the skillmart
//! workspace. This crate has no I/O and no dependencies on application-level
//! code (filesystem layout, network, CLI).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `skill` - Validated `SkillDescriptor`
//! - `text` - Term extraction and light stemming
//! - `scorer` - Pluggable `RelevanceScorer` strategy and the built-in `LexicalScorer`
//! - `matcher` - Deterministic, threshold-gated `SkillMatcher`

pub mod error;
pub mod matcher;
pub mod scorer;
pub mod skill;
pub mod text;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Skills ─────────────────────────────────────────────────────────────
pub use skill::SkillDescriptor;

// ── Matching ───────────────────────────────────────────────────────────
pub use matcher::{MatchCandidate, SkillMatch, SkillMatcher, DEFAULT_MIN_SCORE};
pub use scorer::{LexicalScorer, Query, RelevanceScorer};
