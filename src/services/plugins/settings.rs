//! Marketplace Settings Persistence
//!
//! Persists the list of registered marketplaces at `<root>/marketplaces.json`
//! and their cached indexes at `<root>/marketplaces/<name>.json`.

use std::path::PathBuf;

use crate::services::plugins::manifest::load_index;
use crate::services::plugins::models::{MarketplaceConfig, MarketplaceIndex, MarketplaceSettings};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{write_atomic, InstallLayout};

/// File-backed marketplace registry.
#[derive(Debug, Clone)]
pub struct MarketplaceStore {
    settings_path: PathBuf,
    layout: InstallLayout,
}

impl MarketplaceStore {
    pub fn new(layout: &InstallLayout) -> Self {
        Self {
            settings_path: layout.marketplaces_path(),
            layout: layout.clone(),
        }
    }

    /// Load marketplace settings from disk. Missing file → empty registry.
    pub fn load(&self) -> AppResult<MarketplaceSettings> {
        if !self.settings_path.exists() {
            return Ok(MarketplaceSettings::default());
        }
        let content = std::fs::read_to_string(&self.settings_path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::config(format!("{}: {}", self.settings_path.display(), e))
        })
    }

    fn save(&self, settings: &MarketplaceSettings) -> AppResult<()> {
        let content = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.settings_path, content.as_bytes())
    }

    /// Registered marketplaces, sorted by name.
    pub fn list(&self) -> AppResult<Vec<MarketplaceConfig>> {
        let mut marketplaces = self.load()?.marketplaces;
        marketplaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(marketplaces)
    }

    pub fn get(&self, name: &str) -> AppResult<MarketplaceConfig> {
        self.load()?
            .marketplaces
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| AppError::UnknownMarketplace(name.to_string()))
    }

    /// Register a marketplace together with its first index snapshot.
    pub fn add(&self, config: MarketplaceConfig, index: &MarketplaceIndex) -> AppResult<()> {
        let mut settings = self.load()?;

        if settings.marketplaces.iter().any(|m| m.name == config.name) {
            return Err(AppError::MarketplaceExists(config.name));
        }

        self.write_index(&config.name, index)?;
        settings.marketplaces.push(config);
        self.save(&settings)
    }

    /// Replace the cached index and bump `last_updated`.
    pub fn replace_index(&self, name: &str, index: &MarketplaceIndex) -> AppResult<MarketplaceConfig> {
        let mut settings = self.load()?;
        let marketplace = settings
            .marketplaces
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| AppError::UnknownMarketplace(name.to_string()))?;

        self.write_index(name, index)?;
        marketplace.last_updated = chrono::Utc::now();
        marketplace.plugin_count = index.len();
        let updated = marketplace.clone();
        self.save(&settings)?;
        Ok(updated)
    }

    /// Remove a marketplace and its cached index.
    pub fn remove(&self, name: &str) -> AppResult<MarketplaceConfig> {
        let mut settings = self.load()?;
        let idx = settings
            .marketplaces
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| AppError::UnknownMarketplace(name.to_string()))?;
        let removed = settings.marketplaces.remove(idx);
        self.save(&settings)?;

        let cache = self.layout.marketplace_index_path(name);
        if cache.exists() {
            std::fs::remove_file(cache)?;
        }
        Ok(removed)
    }

    /// Cached index of a registered marketplace.
    pub fn index(&self, name: &str) -> AppResult<MarketplaceIndex> {
        let path = self.layout.marketplace_index_path(name);
        if !path.exists() {
            return Err(AppError::UnknownMarketplace(name.to_string()));
        }
        let bytes = std::fs::read(&path)?;
        load_index(name, &bytes)
    }

    fn write_index(&self, name: &str, index: &MarketplaceIndex) -> AppResult<()> {
        let content = serde_json::to_string_pretty(index)?;
        write_atomic(&self.layout.marketplace_index_path(name), content.as_bytes())
    }
}
