//! Plugin Data Models
//!
//! Data types for marketplaces, plugin manifests and install records.
//!
//! ## Key Types
//!
//! - `MarketplaceIndex` - name → locator listing published by a marketplace
//! - `PluginManifest` - parsed plugin.json (name, version, capabilities, ...)
//! - `CapabilityKind` - the capability directories a plugin may declare
//! - `InstallRecord` - persisted state of one installed plugin
//! - `MarketplaceConfig` - a registered marketplace and where it lives
//! - `PluginRef` - `name@marketplace` reference typed on the command line

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Capabilities
// ============================================================================

/// Capability directories a plugin manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Skills,
    Commands,
    Agents,
    Hooks,
}

impl CapabilityKind {
    pub fn all() -> [CapabilityKind; 4] {
        [Self::Skills, Self::Commands, Self::Agents, Self::Hooks]
    }

    /// Manifest key and default directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skills => "skills",
            Self::Commands => "commands",
            Self::Agents => "agents",
            Self::Hooks => "hooks",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one capability directory.
///
/// Accepts `{"auto_discover": true, "path": "skills"}`, a bare path string,
/// or a bare boolean (`auto_discover`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySpec {
    pub auto_discover: bool,
    /// Directory relative to the plugin root (defaults to the kind name)
    pub path: Option<String>,
}

impl Default for CapabilitySpec {
    fn default() -> Self {
        Self {
            auto_discover: true,
            path: None,
        }
    }
}

impl CapabilitySpec {
    /// Directory of this capability relative to the plugin root.
    pub fn dir(&self, kind: CapabilityKind) -> String {
        self.path
            .as_deref()
            .map(|p| p.trim_start_matches("./").trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| kind.as_str().to_string())
    }
}

impl<'de> Deserialize<'de> for CapabilitySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Object {
            #[serde(default = "default_true")]
            auto_discover: bool,
            #[serde(default)]
            path: Option<String>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Path(String),
            Object(Object),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(auto_discover) => Self {
                auto_discover,
                path: None,
            },
            Repr::Path(path) => Self {
                auto_discover: true,
                path: Some(path),
            },
            Repr::Object(o) => Self {
                auto_discover: o.auto_discover,
                path: o.path,
            },
        })
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Plugin Manifest
// ============================================================================

/// Plugin manifest parsed from plugin.json.
///
/// ```json
/// {
///   "name": "ui-polish",
///   "version": "1.0.0",
///   "description": "UI refactoring guidance",
///   "author": "someone",
///   "license": "MIT",
///   "skills": { "auto_discover": true }
/// }
/// ```
///
/// Built by `manifest::parse_manifest`, which rejects unknown capability kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginManifest {
    /// Plugin name (must equal its install directory name)
    pub name: String,
    /// Semantic version
    pub version: String,
    pub description: String,
    pub author: Option<String>,
    pub license: Option<String>,
    pub repository: Option<String>,
    pub keywords: Vec<String>,
    /// Declared capability directories
    pub capabilities: BTreeMap<CapabilityKind, CapabilitySpec>,
}

impl PluginManifest {
    pub fn capability(&self, kind: CapabilityKind) -> Option<&CapabilitySpec> {
        self.capabilities.get(&kind)
    }
}

/// Deserialize `author` from either a plain string or an object `{ "name": "...", ... }`.
pub(crate) fn deserialize_author<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Object(map)) => Ok(map
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())),
        Some(_) => Ok(None),
    }
}

// ============================================================================
// Marketplace Index
// ============================================================================

/// One plugin listed by a marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(skip)]
    pub name: String,
    /// URL, git reference or path the bundle is fetched from
    pub source: String,
    /// Version constraint published by the marketplace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Expected SHA-256 of an archive bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Parsed marketplace listing. Entry order follows the source document.
///
/// Serializes to the mapping form `{ "<name>": { "source": ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarketplaceIndex {
    /// Name advertised by the index itself, if any
    pub name: Option<String>,
    entries: Vec<IndexEntry>,
}

impl MarketplaceIndex {
    /// Build from entries already checked for unique names.
    pub(crate) fn from_entries(name: Option<String>, entries: Vec<IndexEntry>) -> Self {
        Self { name, entries }
    }

    pub fn get(&self, plugin: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.name == plugin)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MarketplaceIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, entry)?;
        }
        map.end()
    }
}

// ============================================================================
// Marketplace Sources
// ============================================================================

/// How to find a marketplace index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketplaceSourceType {
    /// GitHub repository shorthand (e.g. "acme/skills")
    Github { repo: String },
    /// Direct HTTP(S) URL of an index JSON document
    IndexUrl { url: String },
    /// Git repository containing `.claude-plugin/marketplace.json` or `marketplace.json`
    GitUrl { url: String },
    /// Local index file or directory containing one
    LocalPath { path: String },
}

impl MarketplaceSourceType {
    /// Classify a user-supplied marketplace reference.
    ///
    /// - `github:owner/repo` or bare `owner/repo` (when no such local path exists)
    /// - `http(s)://...json` → index URL
    /// - other `http(s)://`, `git@...`, `*.git` → git URL
    /// - anything else → local path
    pub fn parse(reference: &str) -> AppResult<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::validation("marketplace reference is empty"));
        }

        if let Some(repo) = reference.strip_prefix("github:") {
            return Self::github(repo);
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            if reference.ends_with(".json") {
                return Ok(Self::IndexUrl {
                    url: reference.to_string(),
                });
            }
            return Ok(Self::GitUrl {
                url: reference.to_string(),
            });
        }

        if reference.starts_with("git@") || reference.ends_with(".git") {
            return Ok(Self::GitUrl {
                url: reference.to_string(),
            });
        }

        let path = reference.strip_prefix("file://").unwrap_or(reference);
        let looks_like_repo = !path.starts_with('.')
            && !path.starts_with('/')
            && path.matches('/').count() == 1
            && !std::path::Path::new(path).exists();
        if looks_like_repo {
            return Self::github(path);
        }

        Ok(Self::LocalPath {
            path: path.to_string(),
        })
    }

    fn github(repo: &str) -> AppResult<Self> {
        let repo = repo.trim().trim_end_matches(".git");
        let mut parts = repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::Github {
                    repo: repo.to_string(),
                })
            }
            _ => Err(AppError::validation(format!(
                "GitHub marketplace must be 'owner/repo', got '{}'",
                repo
            ))),
        }
    }

    /// Human-readable display string for the source.
    pub fn display(&self) -> String {
        match self {
            Self::Github { repo } => format!("github:{}", repo),
            Self::IndexUrl { url } | Self::GitUrl { url } => url.clone(),
            Self::LocalPath { path } => format!("local:{}", path),
        }
    }

    /// A default marketplace name derived from the reference.
    pub fn default_name(&self) -> String {
        let raw = match self {
            Self::Github { repo } => repo.rsplit('/').next().unwrap_or(repo).to_string(),
            Self::IndexUrl { url } | Self::GitUrl { url } => {
                let trimmed = url.trim_end_matches('/');
                let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
                let stem = last
                    .trim_end_matches(".git")
                    .trim_end_matches(".json")
                    .to_string();
                if stem == "marketplace" || stem == "index" {
                    trimmed
                        .rsplit('/')
                        .nth(1)
                        .unwrap_or(stem.as_str())
                        .to_string()
                } else {
                    stem
                }
            }
            Self::LocalPath { path } => {
                let p = std::path::Path::new(path);
                let stem = p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("local")
                    .to_string();
                if stem == "marketplace" || stem == "index" {
                    p.parent()
                        .and_then(|d| d.file_name())
                        .and_then(|s| s.to_str())
                        .unwrap_or("local")
                        .to_string()
                } else {
                    stem
                }
            }
        };
        sanitize_name(&raw)
    }
}

/// Lowercase and replace anything outside `[a-z0-9._-]` with `-`.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.').to_string();
    if cleaned.is_empty() {
        "marketplace".to_string()
    } else {
        cleaned
    }
}

/// Check that a plugin or marketplace name is usable as a directory name.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name == "." || name == ".." || name.starts_with('.') {
        return Err(format!("name '{}' must not start with '.'", name));
    }
    if name.len() > 128 {
        return Err(format!("name '{}' is longer than 128 characters", name));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.'))
    {
        return Err(format!("name '{}' contains invalid character '{}'", name, c));
    }
    Ok(())
}

/// A registered marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Unique name for this marketplace
    pub name: String,
    /// Source location
    pub source: MarketplaceSourceType,
    pub added_at: DateTime<Utc>,
    /// When the cached index was last refreshed
    pub last_updated: DateTime<Utc>,
    /// Number of plugins in the cached index
    #[serde(default)]
    pub plugin_count: usize,
}

/// Persisted list of registered marketplaces (`marketplaces.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketplaceSettings {
    #[serde(default)]
    pub marketplaces: Vec<MarketplaceConfig>,
}

// ============================================================================
// Install Records
// ============================================================================

/// Persisted state of one installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub plugin_name: String,
    pub installed_version: String,
    pub install_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    /// Set when an update replaced the bundle
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Locator the bundle was fetched from
    pub source: String,
    /// Marketplace the plugin was installed through
    #[serde(default)]
    pub marketplace: Option<String>,
    /// SHA-256 over the installed directory tree
    pub content_digest: String,
}

impl InstallRecord {
    /// Time of the most recent install or update.
    pub fn last_changed(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.installed_at)
    }
}

// ============================================================================
// Plugin References
// ============================================================================

/// `name@marketplace` (or bare `name`) as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRef {
    pub name: String,
    pub marketplace: Option<String>,
}

impl std::str::FromStr for PluginRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, marketplace) = match s.split_once('@') {
            Some((name, market)) => (name.trim(), Some(market.trim().to_string())),
            None => (s, None),
        };
        validate_name(name).map_err(AppError::validation)?;
        if let Some(m) = &marketplace {
            validate_name(m).map_err(AppError::validation)?;
        }
        Ok(Self {
            name: name.to_string(),
            marketplace,
        })
    }
}

impl std::fmt::Display for PluginRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.marketplace {
            Some(m) => write!(f, "{}@{}", self.name, m),
            None => f.write_str(&self.name),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
