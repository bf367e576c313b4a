//! Plugin Fetcher
//!
//! Resolves a locator to a plugin bundle and stages it under
//! `<root>/staging/`. Nothing here touches `plugins/` or the install records;
//! promotion is the installer's job.
//!
//! ## Locators
//! - local directory: absolute path, `file://...`, or relative to a local marketplace
//! - local or remote `.tar.gz` / `.tgz` archive
//! - git URL (`https://...`, `git@...`, `*.git`) or `github:owner/repo`, shallow clone
//!
//! An index `sha256` is checked against the archive bytes for archives and
//! against the bundle tree digest for directories and git checkouts.
//!
//! ## Retry
//! Transient failures (connect/timeout errors, HTTP 408/429/5xx, git network
//! errors) are retried with exponential backoff up to `fetch.max_attempts`.
//! HTTP 404/410 and other 4xx, integrity mismatches and invalid bundles
//! surface immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use tempfile::TempDir;

use crate::models::settings::FetchSettings;
use crate::services::plugins::manifest::{find_manifest, load_manifest};
use crate::services::plugins::models::PluginManifest;
use crate::services::skills::discovery::{discover_skills, verify_layout, DiscoveredSkill};
use crate::utils::digest::{sha256_hex, tree_digest};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{ensure_dir, InstallLayout};

// ============================================================================
// Locators
// ============================================================================

/// Where a relative `source` is resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceBase {
    /// Directory holding a local marketplace index
    Dir(PathBuf),
    /// Git repository holding the marketplace index
    Git(String),
    /// URL of a remote index document
    Url(String),
}

/// A parsed bundle location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    LocalDir(PathBuf),
    LocalArchive(PathBuf),
    Archive(String),
    Git { url: String, subdir: Option<String> },
}

impl Locator {
    /// Parse a `source` string, resolving relative paths against `base`.
    pub fn resolve(source: &str, base: Option<&SourceBase>) -> AppResult<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(AppError::validation("plugin source is empty"));
        }

        if let Some(repo) = source.strip_prefix("github:") {
            let repo = repo.trim_end_matches(".git").trim_matches('/');
            if repo.split('/').count() != 2 || repo.split('/').any(str::is_empty) {
                return Err(AppError::validation(format!(
                    "GitHub source must be 'github:owner/repo', got '{}'",
                    source
                )));
            }
            return Ok(Self::Git {
                url: format!("https://github.com/{}.git", repo),
                subdir: None,
            });
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            if is_archive_name(source) {
                return Ok(Self::Archive(source.to_string()));
            }
            return Ok(Self::git(source));
        }

        if source.starts_with("git@") || source.starts_with("ssh://") || source.starts_with("git://") {
            return Ok(Self::git(source));
        }

        let path_str = source.strip_prefix("file://").unwrap_or(source);
        let path = Path::new(path_str);

        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match base {
                Some(SourceBase::Dir(dir)) => dir.join(path),
                Some(SourceBase::Git(url)) => {
                    return Ok(Self::Git {
                        url: url.clone(),
                        subdir: Some(path_str.trim_start_matches("./").to_string()),
                    });
                }
                Some(SourceBase::Url(url)) => {
                    let joined = join_url(url, path_str);
                    if is_archive_name(&joined) {
                        return Ok(Self::Archive(joined));
                    }
                    return Err(AppError::validation(format!(
                        "relative source '{}' of a remote index must point at a .tar.gz archive",
                        source
                    )));
                }
                None => path.to_path_buf(),
            }
        };

        if source.ends_with(".git") && !resolved.is_dir() {
            return Ok(Self::git(source));
        }

        if is_archive_name(path_str) {
            Ok(Self::LocalArchive(resolved))
        } else {
            Ok(Self::LocalDir(resolved))
        }
    }

    /// Git locator; `url#sub/dir` selects a directory inside the repository.
    fn git(source: &str) -> Self {
        match source.split_once('#') {
            Some((url, sub)) if !sub.is_empty() => Self::Git {
                url: url.to_string(),
                subdir: Some(sub.to_string()),
            },
            Some((url, _)) => Self::Git {
                url: url.to_string(),
                subdir: None,
            },
            None => Self::Git {
                url: source.to_string(),
                subdir: None,
            },
        }
    }

    /// Display form recorded as the install source. Parses back to the
    /// same locator.
    pub fn display(&self) -> String {
        match self {
            Self::LocalDir(p) | Self::LocalArchive(p) => p.display().to_string(),
            Self::Archive(url) => url.clone(),
            Self::Git { url, subdir: None } => url.clone(),
            Self::Git {
                url,
                subdir: Some(sub),
            } => format!("{}#{}", url, sub),
        }
    }
}

pub(crate) fn is_archive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".tar.gz") || lower.ends_with(".tgz")
}

/// Join a relative path onto the directory of `base_url`.
fn join_url(base_url: &str, relative: &str) -> String {
    let dir = match base_url.rfind('/') {
        Some(idx) if idx > "https://".len() => &base_url[..idx],
        _ => base_url,
    };
    format!("{}/{}", dir, relative.trim_start_matches("./"))
}

// ============================================================================
// Requests and staged bundles
// ============================================================================

/// One bundle to fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Plugin name the index lists; the manifest must agree when set
    pub plugin: Option<String>,
    pub source: String,
    pub base: Option<SourceBase>,
    /// Expected SHA-256 of an archive bundle
    pub sha256: Option<String>,
    pub marketplace: Option<String>,
}

impl FetchRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            plugin: None,
            source: source.into(),
            base: None,
            sha256: None,
            marketplace: None,
        }
    }
}

/// A fetched, validated bundle waiting in the staging area.
///
/// Dropping it without promotion removes the staging directory.
#[derive(Debug)]
pub struct StagedBundle {
    staging: TempDir,
    root: PathBuf,
    pub manifest: PluginManifest,
    pub skills: Vec<DiscoveredSkill>,
    /// SHA-256 over the bundle tree
    pub digest: String,
    /// Locator display string
    pub source: String,
    pub marketplace: Option<String>,
}

impl StagedBundle {
    /// Directory holding plugin.json (inside the staging area).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The staging directory that owns `root`.
    #[cfg(test)]
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Fetches plugin bundles and index documents with bounded retry.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    settings: FetchSettings,
    staging_dir: PathBuf,
}

impl Fetcher {
    pub fn new(layout: &InstallLayout, settings: &FetchSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("skillmart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: settings.clone(),
            staging_dir: layout.staging_dir(),
        })
    }

    /// Fetch, stage and validate one bundle.
    pub async fn fetch(&self, request: &FetchRequest) -> AppResult<StagedBundle> {
        let locator = match Locator::resolve(&request.source, request.base.as_ref())? {
            Locator::LocalDir(p) if p.exists() => Locator::LocalDir(std::fs::canonicalize(&p)?),
            Locator::LocalArchive(p) if p.exists() => Locator::LocalArchive(std::fs::canonicalize(&p)?),
            other => other,
        };
        let label = request.plugin.clone().unwrap_or_else(|| locator.display());
        tracing::debug!(plugin = %label, locator = %locator.display(), "fetching bundle");

        ensure_dir(&self.staging_dir)?;
        let staging = tempfile::Builder::new()
            .prefix("fetch-")
            .tempdir_in(&self.staging_dir)?;
        let target = staging.path().join("bundle");

        match &locator {
            Locator::LocalDir(dir) => {
                if !dir.is_dir() {
                    return Err(AppError::not_found(format!(
                        "plugin directory {} does not exist",
                        dir.display()
                    )));
                }
                copy_dir_recursive(dir, &target)?;
            }
            Locator::LocalArchive(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        AppError::not_found(format!("archive {} does not exist", path.display()))
                    } else {
                        AppError::Io(e)
                    }
                })?;
                verify_checksum(&label, request.sha256.as_deref(), &bytes)?;
                extract_tar_gz(&bytes, &target)?;
            }
            Locator::Archive(url) => {
                let bytes = self.fetch_bytes(url).await?;
                verify_checksum(&label, request.sha256.as_deref(), &bytes)?;
                extract_tar_gz(&bytes, &target)?;
            }
            Locator::Git { url, .. } => {
                self.clone_with_retry(url, &target).await?;
            }
        }

        let mut root = target;
        if let Locator::Git {
            subdir: Some(sub), ..
        } = &locator
        {
            if sub.contains("..") {
                return Err(AppError::validation(format!(
                    "source subdirectory '{}' escapes the repository",
                    sub
                )));
            }
            root = root.join(sub);
            if !root.is_dir() {
                return Err(AppError::not_found(format!("{} has no directory '{}'", locator.display(), sub)));
            }
        }
        let root = bundle_root(&root)?;
        let digest = tree_digest(&root)?;
        if matches!(locator, Locator::LocalDir(_) | Locator::Git { .. }) {
            verify_digest(&label, request.sha256.as_deref(), &digest)?;
        }

        let manifest = load_manifest(&root)?;
        if let Some(expected) = &request.plugin {
            if &manifest.name != expected {
                return Err(AppError::invalid_manifest(
                    root.display(),
                    format!(
                        "index lists plugin '{}' but its manifest is named '{}'",
                        expected, manifest.name
                    ),
                ));
            }
        }
        verify_layout(&root, &manifest)?;
        let skills = discover_skills(&root, &manifest)?;

        tracing::debug!(
            plugin = %manifest.name,
            version = %manifest.version,
            skills = skills.len(),
            "bundle staged"
        );

        Ok(StagedBundle {
            staging,
            root,
            manifest,
            skills,
            digest,
            source: locator.display(),
            marketplace: request.marketplace.clone(),
        })
    }

    /// Fetch several bundles concurrently. Results keep request order.
    pub async fn fetch_all(self: &Arc<Self>, requests: Vec<FetchRequest>) -> Vec<AppResult<StagedBundle>> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let fetcher = Arc::clone(self);
            handles.push(tokio::spawn(async move { fetcher.fetch(&request).await }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(AppError::internal(format!("fetch task failed: {}", e))),
            });
        }
        results
    }

    /// GET `url` with retry; returns the body bytes.
    pub async fn fetch_bytes(&self, url: &str) -> AppResult<Vec<u8>> {
        self.with_retry(url, || self.get_once(url)).await
    }

    async fn get_once(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::network(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::network(url, format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn clone_with_retry(&self, url: &str, target: &Path) -> AppResult<()> {
        self.with_retry(url, move || async move {
            if target.exists() {
                std::fs::remove_dir_all(target)?;
            }
            git_clone(url, target).await
        })
        .await?;

        let git_dir = target.join(".git");
        if git_dir.exists() {
            std::fs::remove_dir_all(&git_dir)?;
        }
        Ok(())
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    async fn with_retry<T, F, Fut>(&self, locator: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut schedule = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.settings.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.settings.max_backoff_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.2)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let wait = schedule
                        .next_backoff()
                        .unwrap_or(Duration::from_millis(self.settings.max_backoff_ms));
                    tracing::warn!(
                        locator,
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient fetch failure, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn classify_status(url: &str, status: reqwest::StatusCode) -> AppError {
    let code = status.as_u16();
    if code == 408 || code == 429 || status.is_server_error() {
        AppError::network(url, format!("HTTP {}", status))
    } else {
        AppError::not_found(format!("{} (HTTP {})", url, status))
    }
}

fn verify_checksum(plugin: &str, expected: Option<&str>, bytes: &[u8]) -> AppResult<()> {
    match expected {
        Some(_) => verify_digest(plugin, expected, &sha256_hex(bytes)),
        None => Ok(()),
    }
}

/// Compare an index `sha256` with the digest actually computed.
fn verify_digest(plugin: &str, expected: Option<&str>, actual: &str) -> AppResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(AppError::IntegrityMismatch {
            plugin: plugin.to_string(),
            expected: expected.to_ascii_lowercase(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

pub(crate) async fn git_clone(url: &str, target: &Path) -> AppResult<()> {
    let output = tokio::process::Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--quiet")
        .arg(url)
        .arg(target)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::config("git is not installed; it is required for git plugin sources")
            } else {
                AppError::internal(format!("Failed to execute git clone: {}", e))
            }
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lower = stderr.to_lowercase();
    let missing = ["not found", "does not exist", "not a git repository", "authentication failed"];
    if missing.iter().any(|m| lower.contains(m)) {
        Err(AppError::not_found(format!("{}: {}", url, stderr)))
    } else {
        Err(AppError::network(url, format!("git clone failed: {}", stderr)))
    }
}

/// The directory inside an unpacked bundle that holds the manifest.
///
/// Archives commonly wrap everything in one top-level directory; that
/// directory is used when the manifest is not at the top.
fn bundle_root(dir: &Path) -> AppResult<PathBuf> {
    if find_manifest(dir).is_some() {
        return Ok(dir.to_path_buf());
    }
    let subdirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match subdirs.as_slice() {
        [only] if find_manifest(only).is_some() => Ok(only.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// Extract a tar.gz archive
fn extract_tar_gz(bytes: &[u8], dest_dir: &Path) -> AppResult<()> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    ensure_dir(dest_dir)?;
    let gz = GzDecoder::new(bytes);
    let mut archive = Archive::new(gz);
    archive.set_preserve_permissions(false);
    archive.unpack(dest_dir).map_err(|e| {
        AppError::invalid_manifest(dest_dir.display(), format!("Failed to extract tar.gz archive: {}", e))
    })?;
    Ok(())
}

/// Recursively copy a directory, skipping `.git`.
pub(crate) fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        std::fs::create_dir_all(dst)?;
    }

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir_recursive(&path, &dest_path)?;
        } else if file_type.is_file() {
            std::fs::copy(&path, &dest_path)?;
        }
    }

    Ok(())
}
