//! Per-file change classification. Rules apply in order; the first match
//! wins.

use serde_json::{Map, Value};

use crate::model::{BumpClass, EntityType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: BumpClass,
    pub reason: Option<String>,
}

impl Classification {
    fn major(reason: impl Into<String>) -> Self {
        Self {
            class: BumpClass::Major,
            reason: Some(reason.into()),
        }
    }

    fn of(class: BumpClass) -> Self {
        Self {
            class,
            reason: None,
        }
    }
}

/// Classify one changed entity file. `base`/`work` are `None` when the file
/// is absent on that side; a present-but-unparseable side arrives as
/// `Value::Null` and falls back to `patch` (the schema validator owns the
/// parse diagnostic).
pub fn classify_change(
    ty: EntityType,
    path_id: &str,
    base: Option<&Value>,
    work: Option<&Value>,
) -> Classification {
    let (base, work) = match (base, work) {
        (Some(base), None) => {
            let id = base
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(path_id);
            return Classification::major(format!("{} deleted: {}", ty.singular(), id));
        }
        (None, Some(_)) => return Classification::of(BumpClass::Minor),
        (None, None) => return Classification::of(BumpClass::Patch),
        (Some(base), Some(work)) => (base, work),
    };

    let (Some(base), Some(work)) = (base.as_object(), work.as_object()) else {
        return Classification::of(BumpClass::Patch);
    };

    let base_id = base.get("id").and_then(Value::as_str);
    let work_id = work.get("id").and_then(Value::as_str);
    if let (Some(old), Some(new)) = (base_id, work_id) {
        if old != new {
            return Classification::major(format!("id changed: {old} -> {new}"));
        }
    }

    let type_specific = match ty {
        EntityType::Property => classify_property(base, work),
        EntityType::Category => classify_category(base, work),
        EntityType::Module | EntityType::Bundle => classify_structural(ty, base, work),
        EntityType::Subobject | EntityType::Template => None,
    };
    if let Some(classification) = type_specific {
        return classification;
    }

    if work.keys().any(|k| !base.contains_key(k)) {
        return Classification::of(BumpClass::Minor);
    }
    Classification::of(BumpClass::Patch)
}

fn classify_property(base: &Map<String, Value>, work: &Map<String, Value>) -> Option<Classification> {
    if let Some(base_datatype) = base.get("datatype") {
        if work.get("datatype") != Some(base_datatype) {
            return Some(Classification::major(format!(
                "datatype changed: {} -> {}",
                render(Some(base_datatype)),
                render(work.get("datatype"))
            )));
        }
    }

    // Narrowing multiple -> single breaks existing data; widening does not.
    if base.get("cardinality").and_then(Value::as_str) == Some("multiple")
        && work.get("cardinality").and_then(Value::as_str) == Some("single")
    {
        return Some(Classification::major(
            "cardinality narrowed: multiple -> single",
        ));
    }

    let base_values = base.get("allowed_values").and_then(Value::as_array);
    let work_values = work.get("allowed_values").and_then(Value::as_array);
    if let (Some(base_values), Some(work_values)) = (base_values, work_values) {
        if let Some(removed) = base_values.iter().find(|v| !work_values.contains(v)) {
            return Some(Classification::major(format!(
                "allowed value removed: {}",
                render(Some(removed))
            )));
        }
        if work_values.iter().any(|v| !base_values.contains(v)) {
            return Some(Classification::of(BumpClass::Minor));
        }
    }
    None
}

fn classify_category(base: &Map<String, Value>, work: &Map<String, Value>) -> Option<Classification> {
    // A base without `required_properties` treats every PR entry as newly
    // required.
    let base_required = string_list(base, "required_properties");
    let work_required = string_list(work, "required_properties");
    if let Some(added) = work_required.iter().find(|id| !base_required.contains(id)) {
        return Some(Classification::major(format!(
            "newly required property: {added}"
        )));
    }

    let base_optional = string_list(base, "optional_properties");
    let work_optional = string_list(work, "optional_properties");
    if let Some(removed) = base_optional.iter().find(|id| !work_optional.contains(id)) {
        return Some(Classification::major(format!(
            "optional property removed: {removed}"
        )));
    }
    None
}

const STRUCTURAL_FIELDS: [&str; 5] = ["id", "label", "description", "categories", "properties"];

fn classify_structural(
    ty: EntityType,
    base: &Map<String, Value>,
    work: &Map<String, Value>,
) -> Option<Classification> {
    for field in STRUCTURAL_FIELDS {
        if base.contains_key(field) && !work.contains_key(field) {
            return Some(Classification::major(format!(
                "{} structural field removed: {}",
                ty.singular(),
                field
            )));
        }
    }
    None
}

fn string_list<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "(absent)".to_string(),
    }
}
