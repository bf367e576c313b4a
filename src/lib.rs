//! skillmart - Plugin Marketplace Client Library
//!
//! Installs plugins from marketplaces into a local install root and picks
//! the installed skills relevant to a task. It includes:
//! - CLI definitions and command handlers
//! - Services: marketplace registry, fetcher, installer, skill discovery
//! - Storage layer (install records, config)
//! - Data models and utilities
//!
//! Skill descriptors and the matcher itself live in `skillmart-core`.

pub mod cli;
pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::plugins::manager::PluginManager;
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
pub use utils::paths::InstallLayout;
