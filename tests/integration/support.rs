//! Shared fixtures: plugin trees, archives and managers over temp roots.

use std::path::{Path, PathBuf};

use skillmart::models::settings::{AppConfig, FetchSettings};
use skillmart::{InstallLayout, PluginManager};

/// Write a plugin directory with one skill per `(id, description)`.
pub fn write_plugin(dir: &Path, name: &str, version: &str, skills: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("plugin.json"),
        format!(
            r#"{{"name": "{}", "version": "{}", "description": "{} plugin", "skills": {{"auto_discover": true}}}}"#,
            name, version, name
        ),
    )
    .unwrap();
    std::fs::create_dir_all(dir.join("skills")).unwrap();
    for (id, description) in skills {
        let skill_dir = dir.join("skills").join(id);
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("SKILL.md"),
            format!(
                "---\nname: {}\ndescription: {}\nallowed-tools: Read, Edit\n---\n\n# {}\n\nFollow the {} checklist.\n",
                id, description, id, id
            ),
        )
        .unwrap();
    }
}

/// Gzipped tar of `dir`, wrapped in a `<name>-<version>/` directory.
pub fn tar_gz(dir: &Path, wrapper: &str) -> Vec<u8> {
    let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(gz);
    builder.append_dir_all(wrapper, dir).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

/// Config with retry delays short enough for tests.
pub fn fast_config() -> AppConfig {
    AppConfig {
        fetch: FetchSettings {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            timeout_secs: 5,
        },
        ..AppConfig::default()
    }
}

pub fn open_manager(root: &Path) -> PluginManager {
    PluginManager::open(&InstallLayout::new(root), &fast_config()).unwrap()
}

/// A local marketplace directory with a mapping-form index.
pub struct LocalMarket {
    pub dir: tempfile::TempDir,
}

impl LocalMarket {
    pub fn new(index_json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marketplace.json"), index_json).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join("plugins").join(name)
    }

    pub fn reference(&self) -> String {
        self.dir.path().display().to_string()
    }
}
