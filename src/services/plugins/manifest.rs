//! Manifest Store
//!
//! Parses and validates marketplace indexes and plugin manifests.
//! Pure functions over bytes and files; nothing here writes to disk.
//!
//! ## Index shapes
//!
//! Mapping form:
//! ```json
//! { "ui-polish": { "source": "https://example.com/ui-polish.tar.gz", "version": "1.0.0" } }
//! ```
//!
//! Marketplace form:
//! ```json
//! { "name": "official", "plugins": [ { "name": "ui-polish", "source": "./plugins/ui-polish" } ] }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::services::plugins::models::{
    deserialize_author, validate_name, CapabilityKind, CapabilitySpec, IndexEntry,
    MarketplaceIndex, PluginManifest,
};
use crate::utils::error::{AppError, AppResult};

/// Manifest file locations tried inside a plugin directory, in order.
pub const MANIFEST_CANDIDATES: [&str; 2] = ["plugin.json", ".claude-plugin/plugin.json"];

/// Manifest keys that carry metadata rather than a capability.
const METADATA_KEYS: &[&str] = &[
    "$schema",
    "name",
    "version",
    "description",
    "author",
    "license",
    "repository",
    "homepage",
    "keywords",
];

// ============================================================================
// Ordered JSON object (keeps duplicate keys)
// ============================================================================

/// A JSON object as an ordered list of key/value pairs.
///
/// `serde_json::Map` silently keeps the last duplicate key; the index format
/// must reject duplicates, so the top level is read through this instead.
struct OrderedObject(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for OrderedObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = OrderedObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    pairs.push((key, value));
                }
                Ok(OrderedObject(pairs))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

// ============================================================================
// Marketplace index
// ============================================================================

/// Parse a marketplace index document.
///
/// `source_name` is used only in error messages (marketplace name or path).
pub fn load_index(source_name: &str, bytes: &[u8]) -> AppResult<MarketplaceIndex> {
    let top: OrderedObject = serde_json::from_slice(bytes)
        .map_err(|e| AppError::invalid_index(source_name, e.to_string()))?;

    let mut pairs = top.0;
    let plugins_at = pairs
        .iter()
        .position(|(key, value)| key == "plugins" && value.is_array());

    let (index_name, raw_entries) = match plugins_at {
        Some(pos) => {
            let name = pairs
                .iter()
                .find(|(k, _)| k == "name")
                .and_then(|(_, v)| v.as_str())
                .map(|s| s.to_string());
            let items = match pairs.swap_remove(pos).1 {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            let mut entries = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let plugin_name = item
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        AppError::invalid_index(
                            source_name,
                            format!("plugins[{}] is missing a string 'name'", i),
                        )
                    })?;
                entries.push((plugin_name, item));
            }
            (name, entries)
        }
        None => (None, pairs),
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (name, value) in raw_entries {
        validate_name(&name).map_err(|e| AppError::invalid_index(source_name, e))?;
        if !seen.insert(name.clone()) {
            return Err(AppError::DuplicatePluginName {
                source_name: source_name.to_string(),
                plugin: name,
            });
        }
        entries.push(parse_index_entry(source_name, name, &value)?);
    }

    Ok(MarketplaceIndex::from_entries(index_name, entries))
}

fn parse_index_entry(source_name: &str, name: String, value: &Value) -> AppResult<IndexEntry> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::invalid_index(source_name, format!("entry '{}' is not an object", name))
    })?;

    let source = obj
        .get("source")
        .and_then(normalize_source)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            AppError::invalid_index(source_name, format!("entry '{}' has no usable 'source'", name))
        })?;

    let optional_str = |key: &str| -> AppResult<Option<String>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(AppError::invalid_index(
                source_name,
                format!("entry '{}' field '{}' must be a string", name, key),
            )),
        }
    };

    let sha256 = optional_str("sha256")?.map(|s| s.to_ascii_lowercase());
    if let Some(hash) = &sha256 {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::invalid_index(
                source_name,
                format!("entry '{}' sha256 must be 64 hex characters", name),
            ));
        }
    }

    Ok(IndexEntry {
        source,
        version: optional_str("version")?,
        sha256,
        description: optional_str("description")?,
        name,
    })
}

/// Collapse the accepted `source` shapes into one locator string.
///
/// - `"https://..."`, `"./plugins/x"` → as-is
/// - `{ "source": "github", "repo": "owner/repo" }` or `{ "repo": ... }` → `github:owner/repo`
/// - `{ "url": ... }` → url
/// - `{ "path": ... }` → path
fn normalize_source(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => {
            if let Some(repo) = map.get("repo").and_then(|v| v.as_str()) {
                return Some(format!("github:{}", repo));
            }
            if let Some(url) = map.get("url").and_then(|v| v.as_str()) {
                return Some(url.to_string());
            }
            map.get("path")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        }
        _ => None,
    }
}

// ============================================================================
// Plugin manifest
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_author")]
    author: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    repository: Option<Value>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

/// Locate the manifest file inside a plugin directory.
pub fn find_manifest(plugin_dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|rel| plugin_dir.join(rel))
        .find(|p| p.is_file())
}

/// Load a manifest from a plugin directory or directly from a manifest file.
pub fn load_manifest(path: &Path) -> AppResult<PluginManifest> {
    let file = if path.is_dir() {
        find_manifest(path).ok_or_else(|| {
            AppError::invalid_manifest(
                path.display(),
                format!("no manifest found (looked for {})", MANIFEST_CANDIDATES.join(", ")),
            )
        })?
    } else {
        path.to_path_buf()
    };

    let bytes = std::fs::read(&file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::invalid_manifest(file.display(), "file does not exist")
        } else {
            AppError::Io(e)
        }
    })?;
    parse_manifest(&file.display().to_string(), &bytes)
}

/// Parse and validate manifest JSON. `origin` names the file in errors.
pub fn parse_manifest(origin: &str, bytes: &[u8]) -> AppResult<PluginManifest> {
    let raw: RawManifest =
        serde_json::from_slice(bytes).map_err(|e| AppError::invalid_manifest(origin, e.to_string()))?;

    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::invalid_manifest(origin, "missing required field 'name'"))?;
    validate_name(&name).map_err(|e| AppError::invalid_manifest(origin, e))?;

    let version = raw
        .version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::invalid_manifest(origin, format!("plugin '{}' is missing 'version'", name))
        })?;
    semver::Version::parse(&version).map_err(|e| {
        AppError::invalid_manifest(
            origin,
            format!("plugin '{}' version '{}' is not semver: {}", name, version, e),
        )
    })?;

    let mut capabilities = BTreeMap::new();
    for (key, value) in raw.rest {
        match CapabilityKind::from_key(&key) {
            Some(kind) => {
                if value.is_null() {
                    continue;
                }
                let spec: CapabilitySpec = serde_json::from_value(value).map_err(|e| {
                    AppError::invalid_manifest(origin, format!("capability '{}': {}", key, e))
                })?;
                if let Some(path) = &spec.path {
                    if path.contains("..") || Path::new(path).is_absolute() {
                        return Err(AppError::invalid_manifest(
                            origin,
                            format!("capability '{}' path '{}' escapes the plugin", key, path),
                        ));
                    }
                }
                capabilities.insert(kind, spec);
            }
            None if value.is_object() && !METADATA_KEYS.contains(&key.as_str()) => {
                return Err(AppError::UnsupportedCapabilityKind { plugin: name, kind: key });
            }
            None => {}
        }
    }

    let repository = match raw.repository {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(map)) => map.get("url").and_then(|v| v.as_str()).map(String::from),
        _ => None,
    };

    Ok(PluginManifest {
        name,
        version,
        description: raw.description.unwrap_or_default(),
        author: raw.author,
        license: raw.license,
        repository,
        keywords: raw.keywords,
        capabilities,
    })
}

// ============================================================================
// Tests
// ============================================================================
