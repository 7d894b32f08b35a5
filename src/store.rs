//! Capability boundaries for the filesystem and the revision-control tool.
//!
//! The engine never touches `std::fs` or `git` directly outside of these
//! traits, so tests can drive it against a scratch directory and a canned
//! history.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::model::EntityType;

/// Read and write files under the repository root by relative path.
pub trait FileStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Write, creating intermediate directories, overwriting any existing
    /// file at the target path.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Read files changed since, and content at, a base revision.
///
/// A failing collaborator is indistinguishable from "no changes": both
/// operations degrade instead of erroring.
pub trait VersionedStore {
    /// Repo-relative paths whose content differs between `base` and the
    /// working tree, including additions and deletions.
    fn list_changed(&self, base: &str) -> Vec<PathBuf>;
    /// File content at `base`, or `None` if it did not exist there.
    fn read_at(&self, base: &str, path: &Path) -> Option<Vec<u8>>;
}

pub struct OsFileStore {
    root: PathBuf,
}

impl OsFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for OsFileStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).exists()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.root.join(path))
    }
}

/// `VersionedStore` backed by the `git` command, run in the repository
/// root.
pub struct GitStore {
    root: PathBuf,
}

impl GitStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn git(&self, args: &[&str]) -> Option<Vec<u8>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(args = ?args, "git invocation failed");
            return None;
        }
        Some(output.stdout)
    }
}

impl VersionedStore for GitStore {
    fn list_changed(&self, base: &str) -> Vec<PathBuf> {
        let Some(stdout) = self.git(&["diff", "--name-only", "--no-renames", base]) else {
            return Vec::new();
        };
        String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    fn read_at(&self, base: &str, path: &Path) -> Option<Vec<u8>> {
        let object = format!("{}:{}", base, path.to_string_lossy());
        self.git(&["show", &object])
    }
}

/// Keep only paths that look like entity files: under a known type
/// directory, `.json`, not `_schema.json`, not under `versions/`.
pub fn is_entity_path(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return false;
    }
    if path.file_name().and_then(|n| n.to_str()) == Some("_schema.json") {
        return false;
    }
    if path
        .components()
        .any(|c| c.as_os_str().to_str() == Some("versions"))
    {
        return false;
    }
    EntityType::classify_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_path_filter() {
        assert!(is_entity_path(Path::new("properties/Name.json")));
        assert!(is_entity_path(Path::new("templates/a/b.json")));
        assert!(!is_entity_path(Path::new("properties/_schema.json")));
        assert!(!is_entity_path(Path::new("modules/Core/versions/1.0.0.json")));
        assert!(!is_entity_path(Path::new("scripts/run.json")));
        assert!(!is_entity_path(Path::new("VERSION")));
    }

    #[test]
    fn os_store_round_trips_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = OsFileStore::new(dir.path());
        let rel = Path::new("modules/Core/versions/1.0.0.json");
        store.write(rel, b"{}\n").unwrap();
        assert!(store.exists(rel));
        assert_eq!(store.read(rel).unwrap(), b"{}\n");
        store.remove(rel).unwrap();
        assert!(!store.exists(rel));
    }

    #[test]
    fn git_store_degrades_to_no_changes_without_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let store = GitStore::new(dir.path());
        assert!(store.list_changed("HEAD~1").is_empty());
        assert!(store
            .read_at("HEAD~1", Path::new("properties/Name.json"))
            .is_none());
    }
}
