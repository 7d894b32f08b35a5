//! Typed view of the six entity kinds stored in an ontology repository.
//!
//! Every entity file is a JSON object with at least `id` and `label`. The
//! structs here name only the fields the engine interprets; everything else
//! is carried verbatim in `extra` so artifact emission loses nothing. The
//! source path is attached by the index builder and never serializes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod semver;

pub use semver::{max_bump, BumpClass, Version, VersionParseError};

/// The six entity kinds, in repository directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "categories")]
    Category,
    #[serde(rename = "properties")]
    Property,
    #[serde(rename = "subobjects")]
    Subobject,
    #[serde(rename = "templates")]
    Template,
    #[serde(rename = "modules")]
    Module,
    #[serde(rename = "bundles")]
    Bundle,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Category,
        EntityType::Property,
        EntityType::Subobject,
        EntityType::Template,
        EntityType::Module,
        EntityType::Bundle,
    ];

    /// The content-bearing types a module may claim.
    pub const CONTENT: [EntityType; 4] = [
        EntityType::Category,
        EntityType::Property,
        EntityType::Subobject,
        EntityType::Template,
    ];

    /// Top-level repository directory holding this type.
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityType::Category => "categories",
            EntityType::Property => "properties",
            EntityType::Subobject => "subobjects",
            EntityType::Template => "templates",
            EntityType::Module => "modules",
            EntityType::Bundle => "bundles",
        }
    }

    /// Singular noun for diagnostics.
    pub fn singular(self) -> &'static str {
        match self {
            EntityType::Category => "category",
            EntityType::Property => "property",
            EntityType::Subobject => "subobject",
            EntityType::Template => "template",
            EntityType::Module => "module",
            EntityType::Bundle => "bundle",
        }
    }

    pub fn from_dir(segment: &str) -> Option<EntityType> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.dir_name() == segment)
    }

    /// Type and path-derived id of an entity file, from its repo-relative
    /// path. Template ids may contain `/`.
    pub fn classify_path(path: &Path) -> Option<(EntityType, String)> {
        let mut components = path.components();
        let first = components.next()?;
        let ty = EntityType::from_dir(first.as_os_str().to_str()?)?;
        let rest: PathBuf = components.collect();
        let rest = rest.to_str()?;
        let id = rest.strip_suffix(".json")?;
        if id.is_empty() {
            return None;
        }
        Some((ty, id.replace('\\', "/")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_subobjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_subobjects: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_display_template: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subobject {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_properties: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subobjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Module {
    /// Declared content ids of one content-bearing type.
    pub fn contents_of(&self, ty: EntityType) -> &[String] {
        match ty {
            EntityType::Category => &self.categories,
            EntityType::Property => &self.properties,
            EntityType::Subobject => &self.subobjects,
            EntityType::Template => &self.templates,
            EntityType::Module | EntityType::Bundle => &[],
        }
    }

    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Bundle {
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(|v| v.parse().ok())
    }
}

/// Any entity, tagged by type.
#[derive(Debug, Clone)]
pub enum Entity {
    Category(Category),
    Property(Property),
    Subobject(Subobject),
    Template(Template),
    Module(Module),
    Bundle(Bundle),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Category(_) => EntityType::Category,
            Entity::Property(_) => EntityType::Property,
            Entity::Subobject(_) => EntityType::Subobject,
            Entity::Template(_) => EntityType::Template,
            Entity::Module(_) => EntityType::Module,
            Entity::Bundle(_) => EntityType::Bundle,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Category(e) => &e.id,
            Entity::Property(e) => &e.id,
            Entity::Subobject(e) => &e.id,
            Entity::Template(e) => &e.id,
            Entity::Module(e) => &e.id,
            Entity::Bundle(e) => &e.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Entity::Category(e) => &e.label,
            Entity::Property(e) => &e.label,
            Entity::Subobject(e) => &e.label,
            Entity::Template(e) => &e.label,
            Entity::Module(e) => &e.label,
            Entity::Bundle(e) => &e.label,
        }
    }

    /// Only modules and bundles are versioned.
    pub fn version(&self) -> Option<&str> {
        match self {
            Entity::Module(e) => e.version.as_deref(),
            Entity::Bundle(e) => e.version.as_deref(),
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Entity::Category(e) => &e.path,
            Entity::Property(e) => &e.path,
            Entity::Subobject(e) => &e.path,
            Entity::Template(e) => &e.path,
            Entity::Module(e) => &e.path,
            Entity::Bundle(e) => &e.path,
        }
    }
}
