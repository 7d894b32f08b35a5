//! In-memory index of every entity in the repository, keyed by type and id.
//!
//! Built once per invocation and read-only afterwards. Files that fail to
//! parse, or whose `id` field is absent, are skipped here without comment;
//! the schema validator reports them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::{Bundle, Category, Entity, EntityType, Module, Property, Subobject, Template};

mod fs_walk;

pub use fs_walk::{discover_entity_files, DiscoveredFile};

#[derive(Debug, Default)]
pub struct EntityIndex {
    pub categories: BTreeMap<String, Category>,
    pub properties: BTreeMap<String, Property>,
    pub subobjects: BTreeMap<String, Subobject>,
    pub templates: BTreeMap<String, Template>,
    pub modules: BTreeMap<String, Module>,
    pub bundles: BTreeMap<String, Bundle>,
}

impl EntityIndex {
    pub fn contains(&self, ty: EntityType, id: &str) -> bool {
        match ty {
            EntityType::Category => self.categories.contains_key(id),
            EntityType::Property => self.properties.contains_key(id),
            EntityType::Subobject => self.subobjects.contains_key(id),
            EntityType::Template => self.templates.contains_key(id),
            EntityType::Module => self.modules.contains_key(id),
            EntityType::Bundle => self.bundles.contains_key(id),
        }
    }

    pub fn get(&self, ty: EntityType, id: &str) -> Option<Entity> {
        match ty {
            EntityType::Category => self.categories.get(id).cloned().map(Entity::Category),
            EntityType::Property => self.properties.get(id).cloned().map(Entity::Property),
            EntityType::Subobject => self.subobjects.get(id).cloned().map(Entity::Subobject),
            EntityType::Template => self.templates.get(id).cloned().map(Entity::Template),
            EntityType::Module => self.modules.get(id).cloned().map(Entity::Module),
            EntityType::Bundle => self.bundles.get(id).cloned().map(Entity::Bundle),
        }
    }

    /// Ids of one type, in id order.
    pub fn ids(&self, ty: EntityType) -> Vec<&str> {
        match ty {
            EntityType::Category => self.categories.keys().map(String::as_str).collect(),
            EntityType::Property => self.properties.keys().map(String::as_str).collect(),
            EntityType::Subobject => self.subobjects.keys().map(String::as_str).collect(),
            EntityType::Template => self.templates.keys().map(String::as_str).collect(),
            EntityType::Module => self.modules.keys().map(String::as_str).collect(),
            EntityType::Bundle => self.bundles.keys().map(String::as_str).collect(),
        }
    }

    /// Repo-relative source path of an indexed entity.
    pub fn path_of(&self, ty: EntityType, id: &str) -> Option<&Path> {
        match ty {
            EntityType::Category => self.categories.get(id).map(|e| e.path.as_path()),
            EntityType::Property => self.properties.get(id).map(|e| e.path.as_path()),
            EntityType::Subobject => self.subobjects.get(id).map(|e| e.path.as_path()),
            EntityType::Template => self.templates.get(id).map(|e| e.path.as_path()),
            EntityType::Module => self.modules.get(id).map(|e| e.path.as_path()),
            EntityType::Bundle => self.bundles.get(id).map(|e| e.path.as_path()),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
            + self.properties.len()
            + self.subobjects.len()
            + self.templates.len()
            + self.modules.len()
            + self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse and index every discovered entity file.
pub fn build_index(files: &[DiscoveredFile]) -> EntityIndex {
    let mut index = EntityIndex::default();
    for file in files {
        match file.entity_type {
            EntityType::Category => {
                insert(&mut index.categories, file);
            }
            EntityType::Property => {
                insert(&mut index.properties, file);
            }
            EntityType::Subobject => {
                insert(&mut index.subobjects, file);
            }
            EntityType::Template => {
                insert(&mut index.templates, file);
            }
            EntityType::Module => {
                insert(&mut index.modules, file);
            }
            EntityType::Bundle => {
                insert(&mut index.bundles, file);
            }
        }
    }
    debug!(entities = index.len(), "entity index built");
    index
}

trait Indexed: DeserializeOwned {
    fn id(&self) -> &str;
    fn set_path(&mut self, path: &Path);
}

macro_rules! indexed {
    ($ty:ty) => {
        impl Indexed for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn set_path(&mut self, path: &Path) {
                self.path = path.to_path_buf();
            }
        }
    };
}

indexed!(Category);
indexed!(Property);
indexed!(Subobject);
indexed!(Template);
indexed!(Module);
indexed!(Bundle);

fn insert<T: Indexed>(map: &mut BTreeMap<String, T>, file: &DiscoveredFile) {
    let Ok(bytes) = fs::read(&file.absolute) else {
        return;
    };
    let Ok(mut entity) = serde_json::from_slice::<T>(&bytes) else {
        return;
    };
    if entity.id().is_empty() {
        return;
    }
    entity.set_path(&file.relative);
    // Duplicate ids within a type keep the last parse; the schema
    // validator surfaces the id/filename mismatch.
    map.insert(entity.id().to_string(), entity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn indexes_by_id_not_filename() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "properties/Renamed.json",
            r#"{"id": "Original", "label": "x", "datatype": "Text"}"#,
        );
        let files = discover_entity_files(dir.path());
        let index = build_index(&files);
        assert!(index.contains(EntityType::Property, "Original"));
        assert!(!index.contains(EntityType::Property, "Renamed"));
        assert_eq!(
            index.path_of(EntityType::Property, "Original").unwrap(),
            Path::new("properties/Renamed.json")
        );
    }

    #[test]
    fn get_wraps_any_type_behind_one_header() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "modules/Core.json",
            r#"{"id": "Core", "label": "Core module", "version": "3.2.1"}"#,
        );
        let index = build_index(&discover_entity_files(dir.path()));
        let entity = index.get(EntityType::Module, "Core").unwrap();
        assert_eq!(entity.id(), "Core");
        assert_eq!(entity.label(), "Core module");
        assert_eq!(entity.version(), Some("3.2.1"));
        assert_eq!(entity.path(), Path::new("modules/Core.json"));
        assert_eq!(entity.entity_type(), EntityType::Module);
        assert!(index.get(EntityType::Bundle, "Core").is_none());
    }

    #[test]
    fn skips_unparseable_and_idless_files_silently() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "properties/Broken.json", "{not json");
        write(dir.path(), "properties/NoId.json", r#"{"label": "x"}"#);
        write(
            dir.path(),
            "properties/Ok.json",
            r#"{"id": "Ok", "label": "x", "datatype": "Text"}"#,
        );
        let files = discover_entity_files(dir.path());
        let index = build_index(&files);
        assert_eq!(index.len(), 1);
        assert!(index.contains(EntityType::Property, "Ok"));
    }
}
