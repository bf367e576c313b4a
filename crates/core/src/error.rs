//! Core Error Types
//!
//! Errors raised by the dependency-light core crate. The application crate
//! folds these into its own `AppError`.

use thiserror::Error;

/// Core error type for skill descriptors and matching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A skill declared no trigger description, so it can never be matched.
    #[error("Skill '{skill_id}' has an empty trigger description")]
    MissingTriggerDescription { skill_id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
