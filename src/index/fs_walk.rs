use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::model::EntityType;

/// An entity candidate found on disk, keyed by its repo-relative path.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub absolute: PathBuf,
    /// Relative to the repository root, starting with the type directory.
    pub relative: PathBuf,
    pub entity_type: EntityType,
    /// Id derived from the path: relative to the type directory, `.json`
    /// stripped.
    pub path_id: String,
}

/// Discover entity files under the six known type directories, in
/// lexicographic path order.
///
/// Skips `_schema.json`, anything under `versions/` (generated artifacts),
/// `node_modules/`, and dot-directories.
pub fn discover_entity_files(root: &Path) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();
    for ty in EntityType::ALL {
        let type_root = root.join(ty.dir_name());
        if !type_root.is_dir() {
            continue;
        }
        let walk_root = type_root.clone();
        for entry in WalkDir::new(&type_root)
            .sort_by_file_name()
            .into_iter()
            // judge only the path below the type directory, so a dotted
            // repository root does not hide everything
            .filter_entry(move |e| {
                let below = e.path().strip_prefix(&walk_root).unwrap_or(e.path());
                !is_ignored(below)
            })
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some("_schema.json") {
                continue;
            }
            let relative = match path.strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            let Some((entity_type, path_id)) = EntityType::classify_path(&relative) else {
                continue;
            };
            files.push(DiscoveredFile {
                absolute: path.to_path_buf(),
                relative,
                entity_type,
                path_id,
            });
        }
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

fn is_ignored(path: &Path) -> bool {
    for component in path.components() {
        if let Component::Normal(name) = component {
            if let Some(seg) = name.to_str() {
                if matches!(seg, "versions" | "node_modules") || seg.starts_with('.') {
                    return true;
                }
            }
        }
    }
    false
}
