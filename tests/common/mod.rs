//! Shared fixture plumbing: build a scratch ontology repository on disk
//! and replay a canned base revision against it.

// not every test binary touches every helper
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ontoci::{discover_entity_files, VersionedStore};

pub const CATEGORY_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id", "label"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"},
    "parents": {"type": "array", "items": {"type": "string"}},
    "required_properties": {"type": "array", "items": {"type": "string"}},
    "optional_properties": {"type": "array", "items": {"type": "string"}},
    "required_subobjects": {"type": "array", "items": {"type": "string"}},
    "optional_subobjects": {"type": "array", "items": {"type": "string"}}
  }
}"#;

pub const PROPERTY_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id", "label", "datatype"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"},
    "datatype": {"type": "string"},
    "cardinality": {"enum": ["single", "multiple"]},
    "allowed_values": {"type": "array", "items": {"type": "string"}},
    "parent_property": {"type": "string"},
    "has_display_template": {"type": "string"}
  }
}"#;

pub const SUBOBJECT_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id", "label"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"},
    "required_properties": {"type": "array", "items": {"type": "string"}},
    "optional_properties": {"type": "array", "items": {"type": "string"}}
  }
}"#;

pub const TEMPLATE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"}
  }
}"#;

pub const MODULE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id", "label", "version"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"},
    "version": {"type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$"},
    "categories": {"type": "array", "items": {"type": "string"}},
    "properties": {"type": "array", "items": {"type": "string"}},
    "subobjects": {"type": "array", "items": {"type": "string"}},
    "templates": {"type": "array", "items": {"type": "string"}},
    "dependencies": {"type": "array", "items": {"type": "string"}}
  }
}"#;

pub const BUNDLE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["id", "label", "version", "modules"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "label": {"type": "string"},
    "version": {"type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$"},
    "modules": {"type": "array", "items": {"type": "string"}},
    "description": {"type": "string"}
  }
}"#;

/// A scratch repository with all six type schemas and a `VERSION` file.
pub struct Repo {
    pub dir: tempfile::TempDir,
}

impl Repo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Self { dir };
        repo.write("categories/_schema.json", CATEGORY_SCHEMA);
        repo.write("properties/_schema.json", PROPERTY_SCHEMA);
        repo.write("subobjects/_schema.json", SUBOBJECT_SCHEMA);
        repo.write("templates/_schema.json", TEMPLATE_SCHEMA);
        repo.write("modules/_schema.json", MODULE_SCHEMA);
        repo.write("bundles/_schema.json", BUNDLE_SCHEMA);
        repo.write("VERSION", "1.0.0\n");
        repo
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn delete(&self, rel: &str) {
        fs::remove_file(self.root().join(rel)).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    /// Snapshot the current entity files as the base revision.
    pub fn snapshot(&self) -> FixtureHistory {
        let mut base_files = BTreeMap::new();
        for file in discover_entity_files(self.root()) {
            let contents = fs::read(&file.absolute).unwrap();
            base_files.insert(file.relative.to_string_lossy().replace('\\', "/"), contents);
        }
        FixtureHistory {
            root: self.root().to_path_buf(),
            base_files,
        }
    }
}

/// Replays a snapshot as the base revision: a file counts as changed when
/// its bytes differ between the snapshot and the working tree.
pub struct FixtureHistory {
    root: PathBuf,
    base_files: BTreeMap<String, Vec<u8>>,
}

impl VersionedStore for FixtureHistory {
    fn list_changed(&self, _base: &str) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = Vec::new();
        let current: BTreeMap<String, Vec<u8>> = discover_entity_files(&self.root)
            .into_iter()
            .map(|f| {
                let contents = fs::read(&f.absolute).unwrap();
                (f.relative.to_string_lossy().replace('\\', "/"), contents)
            })
            .collect();
        for (path, bytes) in &self.base_files {
            match current.get(path) {
                Some(now) if now == bytes => {}
                _ => changed.push(PathBuf::from(path)),
            }
        }
        for path in current.keys() {
            if !self.base_files.contains_key(path) {
                changed.push(PathBuf::from(path));
            }
        }
        changed
    }

    fn read_at(&self, _base: &str, path: &Path) -> Option<Vec<u8>> {
        self.base_files
            .get(&path.to_string_lossy().replace('\\', "/"))
            .cloned()
    }
}
