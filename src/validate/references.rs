//! Cross-reference and constraint validation.
//!
//! One static table names every reference-carrying field; it drives this
//! validator and the cycle detector, so a new reference field is added in
//! exactly one place.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;

use super::error::Finding;
use super::rules::Rule;
use crate::index::EntityIndex;
use crate::model::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    List,
    Scalar,
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceField {
    pub source: EntityType,
    pub field: &'static str,
    pub target: EntityType,
    pub shape: FieldShape,
}

const fn list(source: EntityType, field: &'static str, target: EntityType) -> ReferenceField {
    ReferenceField {
        source,
        field,
        target,
        shape: FieldShape::List,
    }
}

const fn scalar(source: EntityType, field: &'static str, target: EntityType) -> ReferenceField {
    ReferenceField {
        source,
        field,
        target,
        shape: FieldShape::Scalar,
    }
}

/// The authoritative reference-field registry.
pub const REFERENCE_FIELDS: &[ReferenceField] = &[
    list(EntityType::Category, "parents", EntityType::Category),
    list(EntityType::Category, "required_properties", EntityType::Property),
    list(EntityType::Category, "optional_properties", EntityType::Property),
    list(EntityType::Category, "required_subobjects", EntityType::Subobject),
    list(EntityType::Category, "optional_subobjects", EntityType::Subobject),
    list(EntityType::Subobject, "required_properties", EntityType::Property),
    list(EntityType::Subobject, "optional_properties", EntityType::Property),
    scalar(EntityType::Property, "parent_property", EntityType::Property),
    scalar(EntityType::Property, "has_display_template", EntityType::Template),
    list(EntityType::Module, "categories", EntityType::Category),
    list(EntityType::Module, "properties", EntityType::Property),
    list(EntityType::Module, "subobjects", EntityType::Subobject),
    list(EntityType::Module, "templates", EntityType::Template),
    list(EntityType::Module, "dependencies", EntityType::Module),
    list(EntityType::Bundle, "modules", EntityType::Module),
];

/// Referenced ids held by `field` on the entity `(ty, id)`.
fn referenced_ids<'a>(index: &'a EntityIndex, ty: EntityType, id: &str, field: &str) -> Vec<&'a str> {
    fn strs(v: &[String]) -> Vec<&str> {
        v.iter().map(String::as_str).collect()
    }
    match ty {
        EntityType::Category => {
            let Some(c) = index.categories.get(id) else {
                return Vec::new();
            };
            match field {
                "parents" => strs(&c.parents),
                "required_properties" => strs(&c.required_properties),
                "optional_properties" => strs(&c.optional_properties),
                "required_subobjects" => strs(&c.required_subobjects),
                "optional_subobjects" => strs(&c.optional_subobjects),
                _ => Vec::new(),
            }
        }
        EntityType::Subobject => {
            let Some(s) = index.subobjects.get(id) else {
                return Vec::new();
            };
            match field {
                "required_properties" => strs(&s.required_properties),
                "optional_properties" => strs(&s.optional_properties),
                _ => Vec::new(),
            }
        }
        EntityType::Property => {
            let Some(p) = index.properties.get(id) else {
                return Vec::new();
            };
            match field {
                "parent_property" => p.parent_property.as_deref().into_iter().collect(),
                "has_display_template" => p.has_display_template.as_deref().into_iter().collect(),
                _ => Vec::new(),
            }
        }
        EntityType::Module => {
            let Some(m) = index.modules.get(id) else {
                return Vec::new();
            };
            match field {
                "categories" => strs(&m.categories),
                "properties" => strs(&m.properties),
                "subobjects" => strs(&m.subobjects),
                "templates" => strs(&m.templates),
                "dependencies" => strs(&m.dependencies),
                _ => Vec::new(),
            }
        }
        EntityType::Bundle => {
            let Some(b) = index.bundles.get(id) else {
                return Vec::new();
            };
            match field {
                "modules" => strs(&b.modules),
                _ => Vec::new(),
            }
        }
        EntityType::Template => Vec::new(),
    }
}

/// Reverse lookup from a content-bearing entity to the module claiming it,
/// plus the dependency closure machinery the scope check needs.
pub struct ModuleScope<'a> {
    owner: HashMap<(EntityType, &'a str), &'a str>,
    dependencies: HashMap<&'a str, Vec<&'a str>>,
    /// Scope checks are skipped entirely while the module graph is cyclic;
    /// the cycle detector reports the cycle itself.
    cyclic: bool,
    closures: HashMap<&'a str, HashSet<&'a str>>,
}

impl<'a> ModuleScope<'a> {
    pub fn build(index: &'a EntityIndex) -> Self {
        let mut owner = HashMap::new();
        let mut dependencies: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (module_id, module) in &index.modules {
            graph.add_node(module_id.as_str());
            for ty in EntityType::CONTENT {
                for content_id in module.contents_of(ty) {
                    owner
                        .entry((ty, content_id.as_str()))
                        .or_insert(module_id.as_str());
                }
            }
            let deps = dependencies.entry(module_id.as_str()).or_default();
            for dep in &module.dependencies {
                deps.push(dep.as_str());
                if index.modules.contains_key(dep) {
                    graph.add_edge(module_id.as_str(), dep.as_str(), ());
                }
            }
        }
        let cyclic = is_cyclic_directed(&graph);
        Self {
            owner,
            dependencies,
            cyclic,
            closures: HashMap::new(),
        }
    }

    pub fn owner_of(&self, ty: EntityType, id: &'a str) -> Option<&'a str> {
        self.owner.get(&(ty, id)).copied()
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// The module plus all transitive dependencies.
    pub fn closure(&mut self, module_id: &'a str) -> &HashSet<&'a str> {
        if !self.closures.contains_key(module_id) {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut stack = vec![module_id];
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                if let Some(deps) = self.dependencies.get(current) {
                    stack.extend(deps.iter().copied());
                }
            }
            self.closures.insert(module_id, seen);
        }
        &self.closures[module_id]
    }
}

/// Run every reference check in the table, then the overlap constraints.
pub fn check_references(index: &EntityIndex, findings: &mut Vec<Finding>) {
    let mut scope = ModuleScope::build(index);
    for source_type in EntityType::ALL {
        for source_id in index.ids(source_type) {
            for field in REFERENCE_FIELDS
                .iter()
                .filter(|field| field.source == source_type)
            {
                check_field(index, &mut scope, field, source_id, findings);
            }
        }
    }
    check_overlaps(index, findings);
}

fn check_field<'a>(
    index: &'a EntityIndex,
    scope: &mut ModuleScope<'a>,
    field: &ReferenceField,
    source_id: &'a str,
    findings: &mut Vec<Finding>,
) {
    let file = index.path_of(field.source, source_id).map(|p| p.to_path_buf());
    for referenced in referenced_ids(index, field.source, source_id, field.field) {
        if referenced == source_id && field.target == field.source {
            findings.push(Finding::new(
                Rule::SelfReference,
                file.clone(),
                format!(
                    "{} `{}` references itself via `{}`",
                    field.source.singular(),
                    source_id,
                    field.field
                ),
            ));
            continue;
        }
        if !index.contains(field.target, referenced) {
            findings.push(Finding::new(
                Rule::MissingReference,
                file.clone(),
                format!(
                    "{} `{}` field `{}` references unknown {} `{}`",
                    field.source.singular(),
                    source_id,
                    field.field,
                    field.target.singular(),
                    referenced
                ),
            ));
            continue;
        }
        check_scope(scope, field, source_id, referenced, &file, findings);
    }
}

fn check_scope<'a>(
    scope: &mut ModuleScope<'a>,
    field: &ReferenceField,
    source_id: &'a str,
    referenced: &'a str,
    file: &Option<std::path::PathBuf>,
    findings: &mut Vec<Finding>,
) {
    // Only content-bearing sources are scoped, and references to modules
    // never are. Unclaimed entities are exempt on either end.
    if !EntityType::CONTENT.contains(&field.source) || field.target == EntityType::Module {
        return;
    }
    if scope.is_cyclic() {
        return;
    }
    let Some(source_module) = scope.owner_of(field.source, source_id) else {
        return;
    };
    let Some(target_module) = scope.owner_of(field.target, referenced) else {
        return;
    };
    if !scope.closure(source_module).contains(target_module) {
        findings.push(Finding::new(
            Rule::ScopeViolation,
            file.clone(),
            format!(
                "{} `{}` (module `{}`) references {} `{}` in module `{}`, which is not a declared dependency",
                field.source.singular(),
                source_id,
                source_module,
                field.target.singular(),
                referenced,
                target_module
            ),
        ));
    }
}

fn check_overlaps(index: &EntityIndex, findings: &mut Vec<Finding>) {
    for (id, category) in &index.categories {
        overlap(
            Rule::PropertyConflict,
            "category",
            id,
            "required_properties",
            &category.required_properties,
            "optional_properties",
            &category.optional_properties,
            category.path.clone(),
            findings,
        );
        overlap(
            Rule::SubobjectConflict,
            "category",
            id,
            "required_subobjects",
            &category.required_subobjects,
            "optional_subobjects",
            &category.optional_subobjects,
            category.path.clone(),
            findings,
        );
    }
    for (id, subobject) in &index.subobjects {
        overlap(
            Rule::PropertyConflict,
            "subobject",
            id,
            "required_properties",
            &subobject.required_properties,
            "optional_properties",
            &subobject.optional_properties,
            subobject.path.clone(),
            findings,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn overlap(
    rule: Rule,
    kind: &str,
    id: &str,
    required_name: &str,
    required: &[String],
    optional_name: &str,
    optional: &[String],
    file: std::path::PathBuf,
    findings: &mut Vec<Finding>,
) {
    let required_set: BTreeSet<&str> = required.iter().map(String::as_str).collect();
    let shared: Vec<&str> = optional
        .iter()
        .map(String::as_str)
        .filter(|id| required_set.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !shared.is_empty() {
        findings.push(Finding::new(
            rule,
            Some(file),
            format!(
                "{kind} `{id}` lists {} in both `{required_name}` and `{optional_name}`",
                shared
                    .iter()
                    .map(|s| format!("`{s}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }
}
