//! JSON Configuration Management
//!
//! Handles reading and writing `<root>/config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{write_atomic, InstallLayout};

/// Configuration service for skillmart settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load the config for an install root, falling back to defaults when the
    /// file does not exist yet. Nothing is written until `save`.
    pub fn open(layout: &InstallLayout) -> AppResult<Self> {
        let config_path = layout.config_path();
        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            AppConfig::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        write_atomic(path, content.as_bytes())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Update the configuration with a partial update
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = AppConfig::default();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::open(&InstallLayout::new(dir.path())).unwrap();
        assert_eq!(service.get_config(), &AppConfig::default());
        assert!(!dir.path().join("config.json").exists());
    }

    #[test]
    fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        let mut service = ConfigService::open(&layout).unwrap();

        let updated = service
            .update_config(SettingsUpdate {
                top_k: Some(7),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.matcher.top_k, 7);

        let reopened = ConfigService::open(&layout).unwrap();
        assert_eq!(reopened.get_config().matcher.top_k, 7);
    }

    #[test]
    fn test_invalid_update_rejected_and_not_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = ConfigService::open(&InstallLayout::new(dir.path())).unwrap();
        let result = service.update_config(SettingsUpdate {
            max_attempts: Some(0),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(service.get_config().fetch.max_attempts, 3);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let err = ConfigService::open(&InstallLayout::new(dir.path())).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_reset() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        let mut service = ConfigService::open(&layout).unwrap();
        service
            .update_config(SettingsUpdate {
                top_k: Some(9),
                ..Default::default()
            })
            .unwrap();
        service.reset().unwrap();
        assert_eq!(service.get_config(), &AppConfig::default());
    }
}
