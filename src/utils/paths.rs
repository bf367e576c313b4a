//! Install Root Layout
//!
//! Every piece of persisted state lives under a single install root:
//!
//! ```text
//! <root>/
//! ├── config.json              settings (ConfigService)
//! ├── marketplaces.json        registered marketplaces
//! ├── marketplaces/<name>.json cached marketplace indexes
//! ├── installed.json           install record set
//! ├── installed.lock           exclusive lock for record writes
//! ├── plugins/<name>/          live plugin directories
//! └── staging/                 fetched bundles awaiting promotion
//! ```
//!
//! The root is resolved from `--root`, then `SKILLMART_HOME`, then
//! `~/.skillmart`. Tests pass a temporary directory instead.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Environment variable overriding the default install root.
pub const ROOT_ENV_VAR: &str = "SKILLMART_HOME";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Default install root (~/.skillmart/)
pub fn default_root() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".skillmart"))
}

/// Resolve the install root: explicit override, then environment, then default.
pub fn resolve_root(explicit: Option<&Path>) -> AppResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var_os(ROOT_ENV_VAR) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => default_root(),
    }
}

/// Paths of everything stored under one install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn marketplaces_path(&self) -> PathBuf {
        self.root.join("marketplaces.json")
    }

    pub fn marketplace_cache_dir(&self) -> PathBuf {
        self.root.join("marketplaces")
    }

    /// Cached index for a registered marketplace.
    pub fn marketplace_index_path(&self, name: &str) -> PathBuf {
        self.marketplace_cache_dir().join(format!("{}.json", name))
    }

    pub fn records_path(&self) -> PathBuf {
        self.root.join("installed.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join("installed.lock")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    /// Live directory of an installed plugin.
    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.plugins_dir().join(name)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// Create the root, plugins and staging directories if missing.
    pub fn ensure(&self) -> AppResult<()> {
        ensure_dir(&self.root)?;
        ensure_dir(&self.plugins_dir())?;
        ensure_dir(&self.staging_dir())?;
        ensure_dir(&self.marketplace_cache_dir())?;
        Ok(())
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> AppResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::internal(format!("{} has no parent", path.display())))?;
    ensure_dir(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}
