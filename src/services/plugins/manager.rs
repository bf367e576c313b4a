//! Plugin Manager
//!
//! Unified entry point for plugin management. Composes the marketplace
//! registry, the fetcher and the installer over one install root:
//!
//! - `install`: resolve targets, fetch them concurrently, install sequentially
//! - `update`: re-fetch from the marketplace (or the recorded source) and swap
//! - `remove`, `list`, `info`
//! - `installed_skills` / `match_task`: feed installed skills to the matcher

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use skillmart_core::SkillMatch;

use crate::models::settings::AppConfig;
use crate::services::plugins::fetcher::{is_archive_name, FetchRequest, Fetcher};
use crate::services::plugins::installer::{InstallOutcome, Installer};
use crate::services::plugins::manifest::load_manifest;
use crate::services::plugins::marketplace::MarketplaceService;
use crate::services::plugins::models::{InstallRecord, PluginManifest, PluginRef};
use crate::services::skills::discovery::{discover_skills, DiscoveredSkill};
use crate::services::skills::injector::inject_skills;
use crate::services::skills::select::{build_matcher, select_skills, PluginSkills};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::InstallLayout;

/// What `plugin install` was asked to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// `name` or `name@marketplace`, resolved through cached indexes
    Listed(PluginRef),
    /// A direct source: path, archive, URL or `github:owner/repo`
    Direct(String),
}

impl InstallTarget {
    /// Archive names and existing paths are direct sources even when they
    /// would also be valid plugin names.
    pub fn parse(raw: &str) -> Self {
        if is_archive_name(raw) || Path::new(raw).exists() {
            return Self::Direct(raw.to_string());
        }
        match raw.parse::<PluginRef>() {
            Ok(plugin) => Self::Listed(plugin),
            Err(_) => Self::Direct(raw.to_string()),
        }
    }
}

impl std::fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listed(plugin) => write!(f, "{}", plugin),
            Self::Direct(source) => write!(f, "{}", source),
        }
    }
}

/// Installed plugin with its parsed manifest and skills.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub record: InstallRecord,
    pub manifest: PluginManifest,
    pub skills: Vec<DiscoveredSkill>,
}

/// Result of matching a task against installed skills.
#[derive(Debug, Clone, Serialize)]
pub struct TaskMatch {
    pub matches: Vec<SkillMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Plugin lifecycle over one install root.
#[derive(Debug, Clone)]
pub struct PluginManager {
    config: AppConfig,
    fetcher: Arc<Fetcher>,
    marketplaces: MarketplaceService,
    installer: Installer,
}

impl PluginManager {
    /// Open the install root, creating it if needed and recovering from any
    /// interrupted install.
    pub fn open(layout: &InstallLayout, config: &AppConfig) -> AppResult<Self> {
        layout.ensure()?;
        let fetcher = Fetcher::new(layout, &config.fetch)?;
        let marketplaces = MarketplaceService::new(layout, fetcher.clone());
        let installer = Installer::open(layout)?;
        Ok(Self {
            config: config.clone(),
            fetcher: Arc::new(fetcher),
            marketplaces,
            installer,
        })
    }

    pub fn marketplaces(&self) -> &MarketplaceService {
        &self.marketplaces
    }

    /// Install every target. Fetches run concurrently; each staged bundle is
    /// then committed one at a time, so one failure does not affect the
    /// others. Results come back in target order.
    pub async fn install(&self, targets: &[String], force: bool) -> Vec<(String, AppResult<InstallOutcome>)> {
        let mut results: Vec<(String, Option<AppResult<InstallOutcome>>)> = Vec::with_capacity(targets.len());
        let mut requests = Vec::new();
        let mut pending = Vec::new();

        for (i, raw) in targets.iter().enumerate() {
            results.push((raw.clone(), None));
            match self.request_for(&InstallTarget::parse(raw)) {
                Ok(request) => {
                    requests.push(request);
                    pending.push(i);
                }
                Err(e) => results[i].1 = Some(Err(e)),
            }
        }

        let staged = self.fetcher.fetch_all(requests).await;
        for (i, bundle) in pending.into_iter().zip(staged) {
            let outcome = bundle.and_then(|b| self.installer.install(b, force));
            if let Err(e) = &outcome {
                tracing::warn!(target_ref = %targets[i], error = %e, "plugin install failed");
            }
            results[i].1 = Some(outcome);
        }

        results
            .into_iter()
            .map(|(raw, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    Err(AppError::internal(format!("no install result for {}", raw)))
                });
                (raw, outcome)
            })
            .collect()
    }

    /// Re-fetch an installed plugin and swap it in if anything changed.
    ///
    /// Plugins installed from a marketplace are re-resolved through its
    /// cached index so index-side moves and checksum changes are honoured.
    /// Others are fetched again from their recorded source.
    pub async fn update(&self, name: &str) -> AppResult<InstallOutcome> {
        let record = self
            .installer
            .records()
            .get(name)?
            .ok_or_else(|| AppError::NotInstalled(name.to_string()))?;

        let request = match &record.marketplace {
            Some(market) => {
                let plugin = PluginRef {
                    name: record.plugin_name.clone(),
                    marketplace: Some(market.clone()),
                };
                match self.marketplaces.resolve(&plugin) {
                    Ok(resolved) => resolved.fetch_request(),
                    Err(e @ (AppError::UnknownMarketplace(_) | AppError::NotFound(_))) => {
                        tracing::warn!(plugin = %name, error = %e, "falling back to recorded source");
                        self.recorded_request(&record)
                    }
                    Err(e) => return Err(e),
                }
            }
            None => self.recorded_request(&record),
        };

        let staged = self.fetcher.fetch(&request).await?;
        self.installer.update(staged)
    }

    pub fn remove(&self, name: &str) -> AppResult<InstallRecord> {
        self.installer.remove(name)
    }

    /// Install records, sorted by plugin name.
    pub fn list(&self) -> AppResult<Vec<InstallRecord>> {
        self.installer.records().read_all()
    }

    /// Record, manifest and skills of an installed plugin.
    pub fn info(&self, name: &str) -> AppResult<PluginInfo> {
        let record = self
            .installer
            .records()
            .get(name)?
            .ok_or_else(|| AppError::NotInstalled(name.to_string()))?;
        let manifest = load_manifest(&record.install_path)?;
        let skills = discover_skills(&record.install_path, &manifest)?;
        Ok(PluginInfo {
            record,
            manifest,
            skills,
        })
    }

    /// Skills of every installed plugin.
    ///
    /// A plugin whose directory no longer parses is skipped with a warning
    /// rather than hiding every other plugin's skills.
    pub fn installed_skills(&self) -> AppResult<Vec<PluginSkills>> {
        let mut out = Vec::new();
        for record in self.list()? {
            let loaded = load_manifest(&record.install_path)
                .and_then(|manifest| discover_skills(&record.install_path, &manifest));
            match loaded {
                Ok(skills) => out.push(PluginSkills {
                    plugin: record.plugin_name.clone(),
                    installed_at: record.last_changed().timestamp(),
                    skills,
                }),
                Err(e) => {
                    tracing::warn!(plugin = %record.plugin_name, error = %e, "skipping plugin with unreadable skills");
                }
            }
        }
        Ok(out)
    }

    /// Rank installed skills for a task, optionally rendering the matched
    /// bodies into an injectable context block.
    pub fn match_task(&self, task: &str, top_k: Option<usize>, inject: bool) -> AppResult<TaskMatch> {
        let plugins = self.installed_skills()?;
        let matcher = build_matcher(&self.config.matcher, top_k);
        let matches = select_skills(task, &plugins, &matcher);
        let context = if inject && !matches.is_empty() {
            Some(inject_skills(&matches, self.config.matcher.max_content_lines))
        } else {
            None
        };
        Ok(TaskMatch { matches, context })
    }

    fn request_for(&self, target: &InstallTarget) -> AppResult<FetchRequest> {
        match target {
            InstallTarget::Listed(plugin) => Ok(self.marketplaces.resolve(plugin)?.fetch_request()),
            InstallTarget::Direct(source) => Ok(FetchRequest::new(source.clone())),
        }
    }

    fn recorded_request(&self, record: &InstallRecord) -> FetchRequest {
        FetchRequest {
            plugin: Some(record.plugin_name.clone()),
            marketplace: record.marketplace.clone(),
            ..FetchRequest::new(record.source.clone())
        }
    }
}
