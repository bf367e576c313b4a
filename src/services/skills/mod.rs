//! Skill System
//!
//! SKILL.md parsing, per-plugin discovery, and task-time selection on top of
//! the `skillmart-core` matcher.
//!
//! Architecture:
//! - parser.rs:    SKILL.md front matter → `SkillDescriptor`
//! - discovery.rs: capability layout checks and skill file scanning
//! - select.rs:    installed skills → matcher candidates
//! - injector.rs:  matched skills → context block

pub mod discovery;
pub mod injector;
pub mod parser;
pub mod select;

pub use discovery::DiscoveredSkill;
pub use select::PluginSkills;
