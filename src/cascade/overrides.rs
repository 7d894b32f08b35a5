//! Manual bump overrides, read once per invocation from
//! `VERSION_OVERRIDES.json` at the repository root.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::model::BumpClass;
use crate::store::FileStore;

pub const OVERRIDES_FILE: &str = "VERSION_OVERRIDES.json";

/// The reserved key overriding the ontology-level bump.
pub const ONTOLOGY_KEY: &str = "ontology";

/// Load the override map. An absent file is an empty map; entries whose
/// value is not a bump class are dropped with a log line.
pub fn load_overrides(store: &dyn FileStore) -> BTreeMap<String, BumpClass> {
    let Ok(bytes) = store.read(Path::new(OVERRIDES_FILE)) else {
        return BTreeMap::new();
    };
    let Ok(Value::Object(entries)) = serde_json::from_slice::<Value>(&bytes) else {
        warn!("{OVERRIDES_FILE} is not a JSON object; ignoring it");
        return BTreeMap::new();
    };
    let mut overrides = BTreeMap::new();
    for (id, value) in entries {
        match value.as_str().and_then(BumpClass::parse) {
            Some(class) => {
                overrides.insert(id, class);
            }
            None => {
                warn!(%id, "override is not one of major/minor/patch; dropped");
            }
        }
    }
    overrides
}
