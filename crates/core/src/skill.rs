//! Skill Descriptor
//!
//! A validated skill: identity, trigger text, tool allow-list and the
//! instructional body. The body is opaque to matching.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// A single skill parsed from a plugin's skill file.
///
/// Construct through [`SkillDescriptor::new`], which enforces a non-empty
/// trigger description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillDescriptor {
    /// Unique within the owning plugin
    skill_id: String,
    /// Free text the matcher scores against
    trigger_description: String,
    /// Capability names the skill may invoke (empty = unrestricted)
    allowed_tools: BTreeSet<String>,
    /// Instructional content injected into the agent context
    body: String,
}

impl SkillDescriptor {
    pub fn new(
        skill_id: impl Into<String>,
        trigger_description: impl Into<String>,
        allowed_tools: impl IntoIterator<Item = String>,
        body: impl Into<String>,
    ) -> CoreResult<Self> {
        let skill_id = skill_id.into().trim().to_string();
        if skill_id.is_empty() {
            return Err(CoreError::validation("skill id must not be empty"));
        }

        let trigger_description = trigger_description.into().trim().to_string();
        if trigger_description.is_empty() {
            return Err(CoreError::MissingTriggerDescription { skill_id });
        }

        let allowed_tools = allowed_tools
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            skill_id,
            trigger_description,
            allowed_tools,
            body: body.into(),
        })
    }

    pub fn skill_id(&self) -> &str {
        &self.skill_id
    }

    pub fn trigger_description(&self) -> &str {
        &self.trigger_description
    }

    pub fn allowed_tools(&self) -> &BTreeSet<String> {
        &self.allowed_tools
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the skill may invoke `tool`. An empty allow-list permits all tools.
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.contains(tool)
    }
}
