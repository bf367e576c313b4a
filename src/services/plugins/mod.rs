//! Plugin System
//!
//! Marketplace-driven plugin installation.
//!
//! Architecture:
//! - models.rs:      Data types (PluginManifest, MarketplaceIndex, InstallRecord, etc.)
//! - manifest.rs:    Index and plugin.json parsing and validation
//! - settings.rs:    Registered marketplaces and cached indexes
//! - marketplace.rs: Marketplace add/update/remove and plugin resolution
//! - fetcher.rs:     Retrieval of bundles into staging, with retry and checksums
//! - installer.rs:   Atomic promotion of staged bundles and crash recovery
//! - manager.rs:     Unified entry point for plugin management

pub mod fetcher;
pub mod installer;
pub mod manager;
pub mod manifest;
pub mod marketplace;
pub mod models;
pub mod settings;

pub use models::*;
