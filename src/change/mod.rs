//! Change detection against a base revision.
//!
//! The base side of every comparison comes through the `VersionedStore`
//! capability; the working tree comes through `FileStore`. A failing
//! capability degrades to an empty change set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::model::{BumpClass, EntityType};
use crate::store::{is_entity_path, FileStore, VersionedStore};

mod classify;

pub use classify::{classify_change, Classification};

/// One changed entity file and its computed bump class.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub file: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub class: BumpClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChangeRecord {
    /// Path-derived id of the changed entity.
    pub fn entity_id(&self) -> String {
        EntityType::classify_path(Path::new(&self.file))
            .map(|(_, id)| id)
            .unwrap_or_default()
    }
}

/// Everything the cascade needs about the diff against base.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub records: Vec<ChangeRecord>,
    /// `version` strings of changed module files as of the base revision.
    pub base_module_versions: BTreeMap<String, String>,
    /// Likewise for bundles.
    pub base_bundle_versions: BTreeMap<String, String>,
}

impl ChangeSet {
    /// Max over all classified changes; `None` when nothing changed.
    pub fn required_bump(&self) -> Option<BumpClass> {
        self.records.iter().map(|r| r.class).max()
    }
}

pub fn detect_changes(
    versioned: &dyn VersionedStore,
    working: &dyn FileStore,
    base: &str,
) -> ChangeSet {
    let mut paths: Vec<PathBuf> = versioned
        .list_changed(base)
        .into_iter()
        .filter(|p| is_entity_path(p))
        .collect();
    paths.sort();
    paths.dedup();
    debug!(base, changed = paths.len(), "entity files changed since base");

    let mut set = ChangeSet::default();
    for path in paths {
        let Some((entity_type, path_id)) = EntityType::classify_path(&path) else {
            continue;
        };
        let base_bytes = versioned.read_at(base, &path);
        let work_bytes = working.read(&path).ok();

        let base_value = base_bytes.as_deref().map(parse_or_null);
        let work_value = work_bytes.as_deref().map(parse_or_null);

        remember_base_version(&mut set, entity_type, &path_id, base_value.as_ref());

        let classification = classify_change(
            entity_type,
            &path_id,
            base_value.as_ref(),
            work_value.as_ref(),
        );
        set.records.push(ChangeRecord {
            file: path.to_string_lossy().replace('\\', "/"),
            entity_type,
            class: classification.class,
            reason: classification.reason,
        });
    }
    set
}

fn parse_or_null(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

fn remember_base_version(
    set: &mut ChangeSet,
    entity_type: EntityType,
    path_id: &str,
    base: Option<&Value>,
) {
    let Some(version) = base
        .and_then(|v| v.get("version"))
        .and_then(Value::as_str)
    else {
        return;
    };
    match entity_type {
        EntityType::Module => {
            set.base_module_versions
                .insert(path_id.to_string(), version.to_string());
        }
        EntityType::Bundle => {
            set.base_bundle_versions
                .insert(path_id.to_string(), version.to_string());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Canned base revision for tests.
    #[derive(Default)]
    struct FakeHistory {
        changed: Vec<&'static str>,
        base_files: HashMap<&'static str, &'static str>,
    }

    impl VersionedStore for FakeHistory {
        fn list_changed(&self, _base: &str) -> Vec<PathBuf> {
            self.changed.iter().map(PathBuf::from).collect()
        }

        fn read_at(&self, _base: &str, path: &Path) -> Option<Vec<u8>> {
            self.base_files
                .get(path.to_str().unwrap())
                .map(|s| s.as_bytes().to_vec())
        }
    }

    struct FakeTree {
        files: HashMap<&'static str, &'static str>,
    }

    impl FileStore for FakeTree {
        fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
            self.files
                .get(path.to_str().unwrap())
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        fn write(&self, _path: &Path, _bytes: &[u8]) -> std::io::Result<()> {
            unimplemented!("read-only test tree")
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path.to_str().unwrap())
        }

        fn remove(&self, _path: &Path) -> std::io::Result<()> {
            unimplemented!("read-only test tree")
        }
    }

    #[test]
    fn filters_to_entity_paths_and_classifies() {
        let history = FakeHistory {
            changed: vec![
                "properties/Name.json",
                "properties/_schema.json",
                "modules/Core/versions/1.0.0.json",
                ".github/workflows/ci.yml",
            ],
            base_files: HashMap::from([(
                "properties/Name.json",
                r#"{"id": "Name", "datatype": "Text"}"#,
            )]),
        };
        let tree = FakeTree {
            files: HashMap::from([(
                "properties/Name.json",
                r#"{"id": "Name", "datatype": "Integer"}"#,
            )]),
        };
        let set = detect_changes(&history, &tree, "main");
        assert_eq!(set.records.len(), 1);
        let record = &set.records[0];
        assert_eq!(record.file, "properties/Name.json");
        assert_eq!(record.entity_type, EntityType::Property);
        assert_eq!(record.class, BumpClass::Major);
        assert_eq!(record.entity_id(), "Name");
        assert_eq!(set.required_bump(), Some(BumpClass::Major));
    }

    #[test]
    fn deletion_reads_base_side_only() {
        let history = FakeHistory {
            changed: vec!["categories/Gone.json"],
            base_files: HashMap::from([("categories/Gone.json", r#"{"id": "Gone"}"#)]),
        };
        let tree = FakeTree {
            files: HashMap::new(),
        };
        let set = detect_changes(&history, &tree, "main");
        assert_eq!(set.records[0].class, BumpClass::Major);
        assert_eq!(
            set.records[0].reason.as_deref(),
            Some("category deleted: Gone")
        );
    }

    #[test]
    fn captures_base_versions_of_changed_modules() {
        let history = FakeHistory {
            changed: vec!["modules/Core.json"],
            base_files: HashMap::from([(
                "modules/Core.json",
                r#"{"id": "Core", "version": "1.0.0"}"#,
            )]),
        };
        let tree = FakeTree {
            files: HashMap::from([(
                "modules/Core.json",
                r#"{"id": "Core", "version": "1.1.0", "note": "pre-bumped"}"#,
            )]),
        };
        let set = detect_changes(&history, &tree, "main");
        assert_eq!(
            set.base_module_versions.get("Core").map(String::as_str),
            Some("1.0.0")
        );
    }

    #[test]
    fn empty_history_yields_empty_set() {
        let history = FakeHistory::default();
        let tree = FakeTree {
            files: HashMap::new(),
        };
        let set = detect_changes(&history, &tree, "main");
        assert!(set.records.is_empty());
        assert_eq!(set.required_bump(), None);
    }
}
