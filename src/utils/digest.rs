//! Content Digests
//!
//! SHA-256 helpers for archive integrity checks and for detecting whether an
//! updated bundle actually changed.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::utils::error::AppResult;

/// SHA-256 of raw bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over a directory tree.
///
/// Files are visited in sorted relative-path order; each contributes its
/// path and its contents, so renames and edits both change the digest.
/// `.git` directories are skipped.
pub fn tree_digest(root: &Path) -> AppResult<String> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for relative in files {
        let normalized = relative.to_string_lossy().replace('\\', "/");
        hasher.update(normalized.as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(root.join(&relative))?);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> AppResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}
