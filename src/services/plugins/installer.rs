//! Plugin Installer
//!
//! Promotes staged bundles into `<root>/plugins/<name>/` and keeps the
//! install record set in step with the directory tree.
//!
//! ## Promotion
//! 1. live dir → `staging/backup-<name>` (if a previous install exists)
//! 2. staged dir → live dir
//! 3. record set written under the exclusive lock
//! 4. backup deleted
//!
//! A failure in 2 or 3 moves the backup back. A crash anywhere in 1-4 is
//! repaired by `recover`, which runs whenever an `Installer` is opened.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use serde::Serialize;

use crate::services::plugins::fetcher::StagedBundle;
use crate::services::plugins::models::InstallRecord;
use crate::storage::records::RecordStore;
use crate::utils::digest::tree_digest;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::InstallLayout;

/// Prefix of backup directories inside `staging/`.
const BACKUP_PREFIX: &str = "backup-";

/// Staging leftovers younger than this may belong to a fetch still running
/// in another process and are left alone.
const STALE_STAGING_AGE: Duration = Duration::from_secs(15 * 60);

/// Result of an install or update.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub record: InstallRecord,
    /// Record replaced by this operation, if any
    pub previous: Option<InstallRecord>,
    /// False when the bundle was identical and nothing was touched
    pub changed: bool,
}

/// What `recover` repaired.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Plugins whose previous directory was put back
    pub restored: Vec<String>,
    /// Backups of committed operations that were deleted
    pub discarded_backups: Vec<String>,
    /// Abandoned fetch directories removed from staging
    pub discarded_staging: usize,
    /// Plugin directories with no install record that were removed
    pub removed_orphans: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Install { force: bool },
    Update,
}

/// A directory swap that can still be undone.
struct Swap {
    live: PathBuf,
    backup: Option<PathBuf>,
}

impl Swap {
    fn promote(staged: &Path, live: &Path, backup: &Path) -> AppResult<Self> {
        if backup.exists() {
            std::fs::remove_dir_all(backup)?;
        }

        let had_live = live.exists();
        if had_live {
            std::fs::rename(live, backup)?;
        }

        if let Err(e) = std::fs::rename(staged, live) {
            if had_live {
                std::fs::rename(backup, live)?;
            }
            return Err(AppError::Io(e));
        }

        Ok(Self {
            live: live.to_path_buf(),
            backup: had_live.then(|| backup.to_path_buf()),
        })
    }

    fn commit(self) {
        if let Some(backup) = self.backup {
            if let Err(e) = std::fs::remove_dir_all(&backup) {
                tracing::warn!(path = %backup.display(), error = %e, "failed to delete backup");
            }
        }
    }

    fn rollback(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.live) {
            tracing::warn!(path = %self.live.display(), error = %e, "failed to remove new plugin directory");
        }
        if let Some(backup) = self.backup {
            if let Err(e) = std::fs::rename(&backup, &self.live) {
                tracing::warn!(path = %backup.display(), error = %e, "failed to restore backup");
            }
        }
    }
}

/// Installs, updates and removes plugins under one install root.
#[derive(Debug, Clone)]
pub struct Installer {
    layout: InstallLayout,
    records: RecordStore,
}

impl Installer {
    /// Open the installer for `layout`, creating directories and repairing
    /// any interrupted operation.
    pub fn open(layout: &InstallLayout) -> AppResult<Self> {
        layout.ensure()?;
        let installer = Self {
            layout: layout.clone(),
            records: RecordStore::new(layout),
        };
        let report = installer.recover()?;
        if !report.is_empty() {
            tracing::warn!(?report, "recovered from an interrupted operation");
        }
        Ok(installer)
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Install a staged bundle.
    ///
    /// A plugin of the same name from a different source is a
    /// `NameCollision` unless `force` is set. Re-installing identical
    /// content from the same source leaves everything untouched.
    pub fn install(&self, staged: StagedBundle, force: bool) -> AppResult<InstallOutcome> {
        self.commit(staged, Mode::Install { force })
    }

    /// Replace an installed plugin with a freshly fetched bundle.
    ///
    /// An unchanged bundle (same digest and version) is a no-op.
    pub fn update(&self, staged: StagedBundle) -> AppResult<InstallOutcome> {
        self.commit(staged, Mode::Update)
    }

    /// Remove an installed plugin and its record.
    pub fn remove(&self, name: &str) -> AppResult<InstallRecord> {
        let live = self.layout.plugin_dir(name);
        let backup = self.backup_path(name);
        let mut moved = false;

        let result = self.records.with_exclusive(|records| {
            let idx = records
                .iter()
                .position(|r| r.plugin_name == name)
                .ok_or_else(|| AppError::NotInstalled(name.to_string()))?;
            if backup.exists() {
                std::fs::remove_dir_all(&backup)?;
            }
            if live.exists() {
                std::fs::rename(&live, &backup)?;
                moved = true;
            }
            Ok(records.remove(idx))
        });

        match result {
            Ok(record) => {
                if moved {
                    if let Err(e) = std::fs::remove_dir_all(&backup) {
                        tracing::warn!(path = %backup.display(), error = %e, "failed to delete removed plugin");
                    }
                }
                tracing::info!(plugin = name, version = %record.installed_version, "plugin removed");
                Ok(record)
            }
            Err(e) => {
                if moved {
                    std::fs::rename(&backup, &live)?;
                }
                Err(e)
            }
        }
    }

    fn commit(&self, staged: StagedBundle, mode: Mode) -> AppResult<InstallOutcome> {
        let name = staged.manifest.name.clone();
        let live = self.layout.plugin_dir(&name);
        let backup = self.backup_path(&name);
        let mut swap: Option<Swap> = None;

        let result = self.records.with_exclusive(|records| {
            let existing = records.iter().find(|r| r.plugin_name == name).cloned();

            match (&existing, mode) {
                (None, Mode::Update) => return Err(AppError::NotInstalled(name.clone())),
                (Some(prev), Mode::Install { force: false }) if prev.source != staged.source => {
                    return Err(AppError::NameCollision {
                        plugin: name.clone(),
                        existing_source: prev.source.clone(),
                        new_source: staged.source.clone(),
                    });
                }
                _ => {}
            }

            if let Some(prev) = &existing {
                let unchanged = prev.content_digest == staged.digest
                    && prev.installed_version == staged.manifest.version
                    && prev.source == staged.source
                    && live.is_dir();
                let skip = match mode {
                    Mode::Update | Mode::Install { force: false } => unchanged,
                    Mode::Install { force: true } => false,
                };
                if skip {
                    return Ok(InstallOutcome {
                        record: prev.clone(),
                        previous: Some(prev.clone()),
                        changed: false,
                    });
                }
            }

            swap = Some(Swap::promote(staged.root(), &live, &backup)?);

            let now = Utc::now();
            let record = match (&existing, mode) {
                (Some(prev), Mode::Update) => InstallRecord {
                    plugin_name: name.clone(),
                    installed_version: staged.manifest.version.clone(),
                    install_path: live.clone(),
                    installed_at: prev.installed_at,
                    updated_at: Some(now),
                    source: staged.source.clone(),
                    marketplace: prev.marketplace.clone(),
                    content_digest: staged.digest.clone(),
                },
                _ => InstallRecord {
                    plugin_name: name.clone(),
                    installed_version: staged.manifest.version.clone(),
                    install_path: live.clone(),
                    installed_at: now,
                    updated_at: None,
                    source: staged.source.clone(),
                    marketplace: staged.marketplace.clone(),
                    content_digest: staged.digest.clone(),
                },
            };

            records.retain(|r| r.plugin_name != name);
            records.push(record.clone());
            Ok(InstallOutcome {
                record,
                previous: existing,
                changed: true,
            })
        });

        match result {
            Ok(outcome) => {
                if let Some(swap) = swap {
                    swap.commit();
                }
                if outcome.changed {
                    tracing::info!(
                        plugin = %name,
                        version = %outcome.record.installed_version,
                        previous = outcome.previous.as_ref().map(|p| p.installed_version.as_str()),
                        "plugin installed"
                    );
                } else {
                    tracing::info!(plugin = %name, "plugin unchanged");
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Some(swap) = swap {
                    swap.rollback();
                }
                Err(e)
            }
        }
    }

    fn backup_path(&self, name: &str) -> PathBuf {
        self.layout.staging_dir().join(format!("{}{}", BACKUP_PREFIX, name))
    }

    /// Repair the tree after an interrupted install, update or remove.
    pub fn recover(&self) -> AppResult<RecoveryReport> {
        self.recover_older_than(STALE_STAGING_AGE)
    }

    pub(crate) fn recover_older_than(&self, stale_after: Duration) -> AppResult<RecoveryReport> {
        let staging = self.layout.staging_dir();
        let plugins = self.layout.plugins_dir();

        self.records.locked(|records| {
            let mut report = RecoveryReport::default();

            for entry in read_dir_sorted(&staging)? {
                let file_name = entry
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();

                if let Some(plugin) = file_name.strip_prefix(BACKUP_PREFIX) {
                    let live = self.layout.plugin_dir(plugin);
                    let record = records.iter().find(|r| r.plugin_name == plugin);
                    let committed = match record {
                        None => true,
                        Some(r) => live.is_dir() && tree_digest(&live)? == r.content_digest,
                    };
                    if committed {
                        std::fs::remove_dir_all(&entry)?;
                        report.discarded_backups.push(plugin.to_string());
                    } else {
                        if live.exists() {
                            std::fs::remove_dir_all(&live)?;
                        }
                        std::fs::rename(&entry, &live)?;
                        report.restored.push(plugin.to_string());
                    }
                } else if is_older_than(&entry, stale_after) {
                    remove_path(&entry)?;
                    report.discarded_staging += 1;
                }
            }

            for entry in read_dir_sorted(&plugins)? {
                let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !records.iter().any(|r| r.plugin_name == name) {
                    remove_path(&entry)?;
                    report.removed_orphans.push(name.to_string());
                }
            }

            for record in records {
                if !self.layout.plugin_dir(&record.plugin_name).is_dir() {
                    tracing::warn!(
                        plugin = %record.plugin_name,
                        "install record has no plugin directory; reinstall to repair"
                    );
                }
            }

            Ok(report)
        })
    }
}

fn read_dir_sorted(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn is_older_than(path: &Path, age: Duration) -> bool {
    if age.is_zero() {
        return true;
    }
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|elapsed| elapsed >= age)
}

fn remove_path(path: &Path) -> AppResult<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
