//! Error Handling
//!
//! Unified error types for skillmart.
//! Uses thiserror for ergonomic error definitions.
//!
//! Every variant that concerns a plugin or marketplace carries its name so
//! the CLI can report which one failed and why.

use thiserror::Error;

use skillmart_core::CoreError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Marketplace index failed schema validation
    #[error("Invalid marketplace index '{source_name}': {message}")]
    InvalidIndexFormat {
        source_name: String,
        message: String,
    },

    /// Two index entries share a plugin name
    #[error("Marketplace index '{source_name}' lists plugin '{plugin}' more than once")]
    DuplicatePluginName { source_name: String, plugin: String },

    /// plugin.json failed schema validation
    #[error("Invalid plugin manifest at {path}: {message}")]
    InvalidManifestFormat { path: String, message: String },

    /// plugin.json declares a capability directory kind we do not know
    #[error("Plugin '{plugin}' declares unsupported capability kind '{kind}'")]
    UnsupportedCapabilityKind { plugin: String, kind: String },

    /// Skill file front matter has no description
    #[error("Skill file {path} is missing a trigger description")]
    MissingTriggerDescription { path: String },

    /// Skill file front matter is malformed
    #[error("Invalid skill file {path}: {message}")]
    InvalidSkillFormat { path: String, message: String },

    /// Transient network failure (retried before surfacing)
    #[error("Network error fetching {locator}: {message}")]
    Network { locator: String, message: String },

    /// Locator does not resolve to anything
    #[error("Not found: {0}")]
    NotFound(String),

    /// Checksum of a fetched bundle does not match the index
    #[error("Integrity mismatch for '{plugin}': expected sha256 {expected}, got {actual}")]
    IntegrityMismatch {
        plugin: String,
        expected: String,
        actual: String,
    },

    /// A plugin with this name is already installed from another source
    #[error(
        "Plugin '{plugin}' is already installed from {existing_source}; \
         refusing to replace it with {new_source} (use --force to override)"
    )]
    NameCollision {
        plugin: String,
        existing_source: String,
        new_source: String,
    },

    /// Remove/update of a plugin that has no install record
    #[error("Plugin '{0}' is not installed")]
    NotInstalled(String),

    /// Marketplace name not registered
    #[error("Unknown marketplace '{0}'")]
    UnknownMarketplace(String),

    /// Marketplace name already registered
    #[error("Marketplace '{0}' already exists")]
    MarketplaceExists(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an index format error
    pub fn invalid_index(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIndexFormat {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a manifest format error
    pub fn invalid_manifest(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidManifestFormat {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Create a skill format error
    pub fn invalid_skill(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidSkillFormat {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable name of the failure kind, printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIndexFormat { .. } => "InvalidIndexFormat",
            Self::DuplicatePluginName { .. } => "DuplicatePluginName",
            Self::InvalidManifestFormat { .. } => "InvalidManifestFormat",
            Self::UnsupportedCapabilityKind { .. } => "UnsupportedCapabilityKind",
            Self::MissingTriggerDescription { .. } => "MissingTriggerDescription",
            Self::InvalidSkillFormat { .. } => "InvalidSkillFormat",
            Self::Network { .. } => "NetworkError",
            Self::NotFound(_) => "NotFound",
            Self::IntegrityMismatch { .. } => "IntegrityMismatch",
            Self::NameCollision { .. } => "NameCollision",
            Self::NotInstalled(_) => "NotInstalled",
            Self::UnknownMarketplace(_) => "UnknownMarketplace",
            Self::MarketplaceExists(_) => "MarketplaceExists",
            Self::Config(_) => "ConfigError",
            Self::Validation(_) => "ValidationError",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Whether the input failed schema validation (the `InvalidFormat` family).
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndexFormat { .. }
                | Self::DuplicatePluginName { .. }
                | Self::InvalidManifestFormat { .. }
                | Self::UnsupportedCapabilityKind { .. }
                | Self::MissingTriggerDescription { .. }
                | Self::InvalidSkillFormat { .. }
        )
    }

    /// Only transient network failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingTriggerDescription { skill_id } => {
                Self::MissingTriggerDescription { path: skill_id }
            }
            CoreError::Validation(msg) => Self::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_plugin() {
        let err = AppError::NameCollision {
            plugin: "ui-polish".to_string(),
            existing_source: "https://a/ui-polish".to_string(),
            new_source: "https://b/ui-polish".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ui-polish"));
        assert!(msg.contains("--force"));
        assert_eq!(err.kind(), "NameCollision");
    }

    #[test]
    fn test_retryable_only_for_network() {
        assert!(AppError::network("https://x", "timeout").is_retryable());
        assert!(!AppError::not_found("https://x").is_retryable());
        assert!(!AppError::IntegrityMismatch {
            plugin: "p".into(),
            expected: "a".into(),
            actual: "b".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_invalid_format_family() {
        assert!(AppError::invalid_manifest("plugin.json", "missing name").is_invalid_format());
        assert!(AppError::invalid_index("m", "bad").is_invalid_format());
        assert!(!AppError::NotInstalled("p".into()).is_invalid_format());
    }

    #[test]
    fn test_core_error_conversion() {
        let core = CoreError::MissingTriggerDescription {
            skill_id: "skills/x/SKILL.md".to_string(),
        };
        let app: AppError = core.into();
        assert_eq!(app.kind(), "MissingTriggerDescription");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }
}
