//! Application State
//!
//! Everything a command needs: the resolved install root and its
//! configuration. Services are built from it on demand.

use std::path::Path;

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::services::plugins::manager::PluginManager;
use crate::storage::ConfigService;
use crate::utils::error::AppResult;
use crate::utils::paths::{resolve_root, InstallLayout};

/// Per-invocation application state
#[derive(Debug)]
pub struct AppState {
    layout: InstallLayout,
    config: ConfigService,
}

impl AppState {
    /// Resolve the install root and load its configuration.
    pub fn open(root: Option<&Path>) -> AppResult<Self> {
        let layout = InstallLayout::new(resolve_root(root)?);
        let config = ConfigService::open(&layout)?;
        tracing::debug!(root = %layout.root().display(), "opened install root");
        Ok(Self { layout, config })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        self.config.get_config()
    }

    /// Update the configuration
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        self.config.update_config(update)
    }

    /// Reset the configuration to defaults
    pub fn reset_config(&mut self) -> AppResult<AppConfig> {
        self.config.reset()?;
        Ok(self.config.get_config().clone())
    }

    /// Plugin manager over this install root. Opening it runs recovery.
    pub fn plugin_manager(&self) -> AppResult<PluginManager> {
        PluginManager::open(&self.layout, self.config.get_config())
    }
}
