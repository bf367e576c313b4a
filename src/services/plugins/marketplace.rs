//! Marketplace Service
//!
//! Registers marketplaces, fetches and caches their indexes, and resolves
//! `name@marketplace` references to fetch requests.
//!
//! ## Fetch Strategy
//! - **Local path**: read the index file (or `.claude-plugin/marketplace.json`,
//!   `marketplace.json`, `index.json` inside a directory)
//! - **Index URL**: HTTP GET with retry
//! - **GitHub**: raw.githubusercontent.com, `main` then `master`
//! - **Git URL**: shallow clone to a temp dir, then read the index
//!
//! Indexes are cached at `marketplace add` and refreshed only by
//! `marketplace update`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::services::plugins::fetcher::{git_clone, FetchRequest, Fetcher, SourceBase};
use crate::services::plugins::manifest::load_index;
use crate::services::plugins::models::{
    validate_name, IndexEntry, MarketplaceConfig, MarketplaceIndex, MarketplaceSourceType, PluginRef,
};
use crate::services::plugins::settings::MarketplaceStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::InstallLayout;

/// Index file names tried inside a marketplace directory or repository.
const INDEX_CANDIDATES: [&str; 3] = [".claude-plugin/marketplace.json", "marketplace.json", "index.json"];

/// Raw content host for GitHub marketplaces. Tests point this elsewhere.
const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// A plugin reference resolved against a marketplace index.
#[derive(Debug, Clone)]
pub struct ResolvedPlugin {
    pub marketplace: MarketplaceConfig,
    pub entry: IndexEntry,
}

impl ResolvedPlugin {
    /// Fetch request for this plugin, with relative sources anchored to the
    /// marketplace location.
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            plugin: Some(self.entry.name.clone()),
            source: self.entry.source.clone(),
            base: source_base(&self.marketplace.source),
            sha256: self.entry.sha256.clone(),
            marketplace: Some(self.marketplace.name.clone()),
        }
    }
}

/// Anchor for relative plugin sources of a marketplace.
pub fn source_base(source: &MarketplaceSourceType) -> Option<SourceBase> {
    match source {
        MarketplaceSourceType::LocalPath { path } => {
            let p = Path::new(path);
            let dir = if p.is_dir() {
                p.to_path_buf()
            } else {
                let parent = p.parent().map(Path::to_path_buf).unwrap_or_default();
                // `.claude-plugin/marketplace.json` sources are relative to the repo root
                if parent.file_name().and_then(|n| n.to_str()) == Some(".claude-plugin") {
                    parent.parent().map(Path::to_path_buf).unwrap_or(parent)
                } else {
                    parent
                }
            };
            Some(SourceBase::Dir(dir))
        }
        MarketplaceSourceType::IndexUrl { url } => Some(SourceBase::Url(url.clone())),
        MarketplaceSourceType::GitUrl { url } => Some(SourceBase::Git(url.clone())),
        MarketplaceSourceType::Github { repo } => {
            Some(SourceBase::Git(format!("https://github.com/{}.git", repo)))
        }
    }
}

/// Marketplace operations over one install root.
#[derive(Debug, Clone)]
pub struct MarketplaceService {
    store: MarketplaceStore,
    fetcher: Fetcher,
    github_raw_base: String,
}

impl MarketplaceService {
    pub fn new(layout: &InstallLayout, fetcher: Fetcher) -> Self {
        Self {
            store: MarketplaceStore::new(layout),
            fetcher,
            github_raw_base: GITHUB_RAW_BASE.to_string(),
        }
    }

    /// Point GitHub lookups at another raw content host.
    pub fn with_github_raw_base(mut self, base: impl Into<String>) -> Self {
        self.github_raw_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn store(&self) -> &MarketplaceStore {
        &self.store
    }

    /// Register a marketplace and cache its index.
    ///
    /// The name defaults to the one advertised by the index, then to one
    /// derived from the reference.
    pub async fn add(&self, reference: &str, name: Option<&str>) -> AppResult<(MarketplaceConfig, MarketplaceIndex)> {
        let mut source = MarketplaceSourceType::parse(reference)?;
        if let MarketplaceSourceType::LocalPath { path } = &source {
            let canonical = std::fs::canonicalize(path).map_err(|_| {
                AppError::not_found(format!("marketplace path {} does not exist", path))
            })?;
            source = MarketplaceSourceType::LocalPath {
                path: canonical.display().to_string(),
            };
        }

        let provisional = name.map(str::to_string).unwrap_or_else(|| source.default_name());
        let index = self.fetch_index(&provisional, &source).await?;

        let name = match name {
            Some(n) => n.to_string(),
            None => index
                .name
                .clone()
                .filter(|n| validate_name(n).is_ok())
                .unwrap_or(provisional),
        };
        validate_name(&name).map_err(AppError::validation)?;

        let now = Utc::now();
        let config = MarketplaceConfig {
            name: name.clone(),
            source,
            added_at: now,
            last_updated: now,
            plugin_count: index.len(),
        };
        self.store.add(config.clone(), &index)?;
        tracing::info!(marketplace = %name, plugins = index.len(), source = %config.source.display(), "marketplace added");
        Ok((config, index))
    }

    /// Re-fetch a marketplace index and replace the cached copy.
    ///
    /// On failure the previous cache stays in place.
    pub async fn update(&self, name: &str) -> AppResult<(MarketplaceConfig, MarketplaceIndex)> {
        let config = self.store.get(name)?;
        let index = self.fetch_index(name, &config.source).await?;
        let updated = self.store.replace_index(name, &index)?;
        tracing::info!(marketplace = %name, plugins = index.len(), "marketplace updated");
        Ok((updated, index))
    }

    pub fn list(&self) -> AppResult<Vec<MarketplaceConfig>> {
        self.store.list()
    }

    pub fn remove(&self, name: &str) -> AppResult<MarketplaceConfig> {
        let removed = self.store.remove(name)?;
        tracing::info!(marketplace = %name, "marketplace removed");
        Ok(removed)
    }

    /// Cached index of a registered marketplace.
    pub fn index(&self, name: &str) -> AppResult<MarketplaceIndex> {
        self.store.get(name)?;
        self.store.index(name)
    }

    /// Resolve `name@marketplace` against cached indexes.
    ///
    /// Without a marketplace the plugin must be listed by exactly one
    /// registered marketplace.
    pub fn resolve(&self, plugin: &PluginRef) -> AppResult<ResolvedPlugin> {
        if let Some(market) = &plugin.marketplace {
            let marketplace = self.store.get(market)?;
            let index = self.store.index(market)?;
            let entry = index.get(&plugin.name).cloned().ok_or_else(|| {
                AppError::not_found(format!(
                    "plugin '{}' is not listed by marketplace '{}'",
                    plugin.name, market
                ))
            })?;
            return Ok(ResolvedPlugin { marketplace, entry });
        }

        let mut found = Vec::new();
        for marketplace in self.store.list()? {
            let index = self.store.index(&marketplace.name)?;
            if let Some(entry) = index.get(&plugin.name) {
                found.push(ResolvedPlugin {
                    entry: entry.clone(),
                    marketplace,
                });
            }
        }

        match found.len() {
            0 => Err(AppError::not_found(format!(
                "plugin '{}' is not listed by any registered marketplace",
                plugin.name
            ))),
            1 => Ok(found.remove(0)),
            _ => {
                let names: Vec<_> = found.iter().map(|f| f.marketplace.name.as_str()).collect();
                Err(AppError::validation(format!(
                    "plugin '{}' is listed by several marketplaces ({}); use {}@<marketplace>",
                    plugin.name,
                    names.join(", "),
                    plugin.name
                )))
            }
        }
    }

    async fn fetch_index(&self, name: &str, source: &MarketplaceSourceType) -> AppResult<MarketplaceIndex> {
        let bytes = match source {
            MarketplaceSourceType::LocalPath { path } => read_local_index(Path::new(path))?,
            MarketplaceSourceType::IndexUrl { url } => self.fetcher.fetch_bytes(url).await?,
            MarketplaceSourceType::Github { repo } => self.fetch_github_index(repo).await?,
            MarketplaceSourceType::GitUrl { url } => fetch_git_index(url).await?,
        };
        load_index(name, &bytes)
    }

    /// Try `main` then `master`, and each index location on both.
    async fn fetch_github_index(&self, repo: &str) -> AppResult<Vec<u8>> {
        for branch in ["main", "master"] {
            for candidate in INDEX_CANDIDATES {
                let url = format!("{}/{}/{}/{}", self.github_raw_base, repo, branch, candidate);
                match self.fetcher.fetch_bytes(&url).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(AppError::NotFound(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Err(AppError::not_found(format!(
            "no marketplace index found in github:{} (tried main and master)",
            repo
        )))
    }
}

fn read_local_index(path: &Path) -> AppResult<Vec<u8>> {
    let file = if path.is_dir() {
        find_index_file(path).ok_or_else(|| {
            AppError::not_found(format!(
                "no marketplace index in {} (looked for {})",
                path.display(),
                INDEX_CANDIDATES.join(", ")
            ))
        })?
    } else {
        path.to_path_buf()
    };
    std::fs::read(&file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found(format!("marketplace index {} does not exist", file.display()))
        } else {
            AppError::Io(e)
        }
    })
}

fn find_index_file(dir: &Path) -> Option<PathBuf> {
    INDEX_CANDIDATES
        .iter()
        .map(|c| dir.join(c))
        .find(|p| p.is_file())
}

async fn fetch_git_index(url: &str) -> AppResult<Vec<u8>> {
    let temp_dir = tempfile::tempdir()?;
    let clone_path = temp_dir.path().join("marketplace");
    git_clone(url, &clone_path).await?;
    read_local_index(&clone_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::FetchSettings;

    fn service(root: &Path) -> MarketplaceService {
        let layout = InstallLayout::new(root);
        let fetcher = Fetcher::new(&layout, &FetchSettings::default()).unwrap();
        MarketplaceService::new(&layout, fetcher)
    }

    fn write_index(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("marketplace.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[tokio::test]
    async fn test_add_local_marketplace() {
        let root = tempfile::tempdir().unwrap();
        let market = tempfile::tempdir().unwrap();
        write_index(market.path(), r#"{"ui-polish": {"source": "./plugins/ui-polish", "version": "1.0.0"}}"#);

        let svc = service(root.path());
        let (config, index) = svc
            .add(&market.path().display().to_string(), Some("local"))
            .await
            .unwrap();
        assert_eq!(config.name, "local");
        assert_eq!(index.len(), 1);
        assert_eq!(svc.list().unwrap().len(), 1);

        let err = svc
            .add(&market.path().display().to_string(), Some("local"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "MarketplaceExists");
    }

    #[tokio::test]
    async fn test_add_uses_index_name() {
        let root = tempfile::tempdir().unwrap();
        let market = tempfile::tempdir().unwrap();
        write_index(market.path(), r#"{"name": "team-skills", "plugins": []}"#);
        let (config, _) = service(root.path())
            .add(&market.path().display().to_string(), None)
            .await
            .unwrap();
        assert_eq!(config.name, "team-skills");
    }

    #[tokio::test]
    async fn test_add_invalid_index_registers_nothing() {
        let root = tempfile::tempdir().unwrap();
        let market = tempfile::tempdir().unwrap();
        write_index(market.path(), r#"{"x": {"source": "./a"}, "x": {"source": "./b"}}"#);
        let svc = service(root.path());
        let err = svc
            .add(&market.path().display().to_string(), Some("m"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "DuplicatePluginName");
        assert!(svc.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_refreshes_cache_only_on_update() {
        let root = tempfile::tempdir().unwrap();
        let market = tempfile::tempdir().unwrap();
        let index_path = write_index(market.path(), r#"{"a": {"source": "./a"}}"#);
        let svc = service(root.path());
        svc.add(&index_path.display().to_string(), Some("m")).await.unwrap();

        std::fs::write(&index_path, r#"{"a": {"source": "./a"}, "b": {"source": "./b"}}"#).unwrap();
        assert!(svc.index("m").unwrap().get("b").is_none());

        svc.update("m").await.unwrap();
        assert!(svc.index("m").unwrap().get("b").is_some());

        std::fs::write(&index_path, "garbage").unwrap();
        assert_eq!(svc.update("m").await.unwrap_err().kind(), "InvalidIndexFormat");
        assert!(svc.index("m").unwrap().get("b").is_some());
    }

    #[tokio::test]
    async fn test_resolve_and_fetch_request() {
        let root = tempfile::tempdir().unwrap();
        let market = tempfile::tempdir().unwrap();
        write_index(market.path(), r#"{"ui-polish": {"source": "./plugins/ui-polish"}}"#);
        let svc = service(root.path());
        svc.add(&market.path().display().to_string(), Some("local")).await.unwrap();

        let by_market = svc.resolve(&"ui-polish@local".parse().unwrap()).unwrap();
        let bare = svc.resolve(&"ui-polish".parse().unwrap()).unwrap();
        assert_eq!(by_market.entry, bare.entry);

        let request = by_market.fetch_request();
        assert_eq!(request.plugin.as_deref(), Some("ui-polish"));
        assert_eq!(request.marketplace.as_deref(), Some("local"));
        assert!(matches!(request.base, Some(SourceBase::Dir(_))));

        assert_eq!(
            svc.resolve(&"missing@local".parse().unwrap()).unwrap_err().kind(),
            "NotFound"
        );
        assert_eq!(
            svc.resolve(&"ui-polish@nowhere".parse().unwrap()).unwrap_err().kind(),
            "UnknownMarketplace"
        );
    }

    #[test]
    fn test_source_base_for_claude_layout() {
        let base = source_base(&MarketplaceSourceType::LocalPath {
            path: "/repo/.claude-plugin/marketplace.json".to_string(),
        });
        assert_eq!(base, Some(SourceBase::Dir(PathBuf::from("/repo"))));
    }
}
