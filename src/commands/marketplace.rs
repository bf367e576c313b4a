//! Marketplace Commands
//!
//! `marketplace add | update | list | remove`.

use serde::Serialize;

use crate::commands::CommandOutput;
use crate::services::plugins::models::MarketplaceConfig;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// A marketplace together with the plugins its cached index lists.
#[derive(Debug, Serialize)]
struct MarketplaceView {
    #[serde(flatten)]
    config: MarketplaceConfig,
    plugins: Vec<String>,
}

pub async fn add(state: &AppState, reference: &str, name: Option<&str>) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let (config, index) = manager.marketplaces().add(reference, name).await?;
    let text = format!(
        "Added marketplace '{}' ({} plugins) from {}",
        config.name,
        index.len(),
        config.source.display()
    );
    let view = MarketplaceView {
        plugins: index.entries().iter().map(|e| e.name.clone()).collect(),
        config,
    };
    CommandOutput::new(&view, text)
}

pub async fn update(state: &AppState, name: &str) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let (config, index) = manager.marketplaces().update(name).await?;
    let text = format!("Updated marketplace '{}' ({} plugins)", config.name, index.len());
    let view = MarketplaceView {
        plugins: index.entries().iter().map(|e| e.name.clone()).collect(),
        config,
    };
    CommandOutput::new(&view, text)
}

pub fn list(state: &AppState) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let marketplaces = manager.marketplaces().list()?;

    let text = if marketplaces.is_empty() {
        "No marketplaces registered.".to_string()
    } else {
        marketplaces
            .iter()
            .map(|m| {
                format!(
                    "{:<24} {:>4} plugins  updated {}  {}",
                    m.name,
                    m.plugin_count,
                    m.last_updated.format("%Y-%m-%d %H:%M"),
                    m.source.display()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    CommandOutput::new(&marketplaces, text)
}

pub fn remove(state: &AppState, name: &str) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let removed = manager.marketplaces().remove(name)?;
    let text = format!("Removed marketplace '{}'", removed.name);
    CommandOutput::new(&removed, text)
}
