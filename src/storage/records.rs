//! Install Record Store
//!
//! Persists the set of installed plugins in `<root>/installed.json`.
//!
//! Every mutation runs under an exclusive lock on `<root>/installed.lock`
//! and replaces the file through `write_atomic`, so concurrent CLI
//! processes serialize their writes and a crash leaves either the old or the
//! new record set on disk.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::services::plugins::models::InstallRecord;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{ensure_dir, write_atomic, InstallLayout};

/// On-disk shape of installed.json
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    #[serde(default)]
    plugins: Vec<InstallRecord>,
}

/// Locked access to the install record set.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records_path: PathBuf,
    lock_path: PathBuf,
}

impl RecordStore {
    pub fn new(layout: &InstallLayout) -> Self {
        Self {
            records_path: layout.records_path(),
            lock_path: layout.lock_path(),
        }
    }

    /// Snapshot of every record, sorted by plugin name.
    pub fn read_all(&self) -> AppResult<Vec<InstallRecord>> {
        let mut lock = fd_lock::RwLock::new(self.open_lock_file()?);
        let _guard = lock.read()?;
        self.load()
    }

    /// Record for one plugin, if installed.
    pub fn get(&self, plugin: &str) -> AppResult<Option<InstallRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|r| r.plugin_name == plugin))
    }

    /// Run `f` against the record set while holding the exclusive lock.
    ///
    /// The (possibly modified) set is written back only when `f` succeeds.
    pub fn with_exclusive<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Vec<InstallRecord>) -> AppResult<T>,
    {
        let mut lock = fd_lock::RwLock::new(self.open_lock_file()?);
        let _guard = lock.write()?;

        let mut records = self.load()?;
        let value = f(&mut records)?;
        self.store(records)?;
        Ok(value)
    }

    /// Run `f` against a snapshot while holding the exclusive lock, without
    /// writing anything back.
    pub fn locked<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&[InstallRecord]) -> AppResult<T>,
    {
        let mut lock = fd_lock::RwLock::new(self.open_lock_file()?);
        let _guard = lock.write()?;
        let records = self.load()?;
        f(&records)
    }

    /// Insert or replace the record for `record.plugin_name`.
    #[cfg(test)]
    pub fn upsert(&self, record: InstallRecord) -> AppResult<()> {
        self.with_exclusive(|records| {
            records.retain(|r| r.plugin_name != record.plugin_name);
            records.push(record);
            Ok(())
        })
    }

    /// Remove the record for `plugin`, returning it.
    #[cfg(test)]
    pub fn remove(&self, plugin: &str) -> AppResult<InstallRecord> {
        self.with_exclusive(|records| {
            let idx = records
                .iter()
                .position(|r| r.plugin_name == plugin)
                .ok_or_else(|| AppError::NotInstalled(plugin.to_string()))?;
            Ok(records.remove(idx))
        })
    }

    fn open_lock_file(&self) -> AppResult<File> {
        if let Some(parent) = self.lock_path.parent() {
            ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn load(&self) -> AppResult<Vec<InstallRecord>> {
        if !self.records_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.records_path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: RecordFile = serde_json::from_str(&content).map_err(|e| {
            AppError::internal(format!(
                "install records at {} are corrupt: {}",
                self.records_path.display(),
                e
            ))
        })?;
        let mut plugins = file.plugins;
        plugins.sort_by(|a, b| a.plugin_name.cmp(&b.plugin_name));
        Ok(plugins)
    }

    fn store(&self, mut records: Vec<InstallRecord>) -> AppResult<()> {
        records.sort_by(|a, b| a.plugin_name.cmp(&b.plugin_name));
        let content = serde_json::to_string_pretty(&RecordFile { plugins: records })?;
        write_atomic(&self.records_path, content.as_bytes())
    }
}
