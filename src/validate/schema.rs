//! Structural validation of entity files against their per-type
//! `_schema.json`, plus id/filename consistency.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use super::error::Finding;
use super::rules::Rule;
use crate::index::DiscoveredFile;

/// Compiles each `_schema.json` once and reuses it across files.
pub struct SchemaValidator {
    root: PathBuf,
    cache: HashMap<PathBuf, Result<JSONSchema, String>>,
}

impl SchemaValidator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn check_files(&mut self, files: &[DiscoveredFile], findings: &mut Vec<Finding>) {
        for file in files {
            self.check_file(file, findings);
        }
    }

    pub fn check_file(&mut self, file: &DiscoveredFile, findings: &mut Vec<Finding>) {
        let Some(schema_rel) = self.locate_schema(&file.relative) else {
            findings.push(Finding::new(
                Rule::NoSchema,
                Some(file.relative.clone()),
                format!(
                    "no `_schema.json` found between `{}` and the repository root",
                    file.relative.display()
                ),
            ));
            return;
        };

        let bytes = match fs::read(&file.absolute) {
            Ok(bytes) => bytes,
            Err(err) => {
                findings.push(Finding::new(
                    Rule::Parse,
                    Some(file.relative.clone()),
                    format!("unreadable file: {err}"),
                ));
                return;
            }
        };
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                // serde_json's Display names the line and column
                findings.push(Finding::new(
                    Rule::Parse,
                    Some(file.relative.clone()),
                    format!("invalid JSON: {err}"),
                ));
                return;
            }
        };

        match self.compiled(&schema_rel) {
            Ok(compiled) => {
                if let Err(errors) = compiled.validate(&value) {
                    let details: Vec<String> = errors
                        .map(|e| {
                            if e.instance_path.to_string().is_empty() {
                                e.to_string()
                            } else {
                                format!("{} (at {})", e, e.instance_path)
                            }
                        })
                        .collect();
                    findings.push(Finding::new(
                        Rule::Schema,
                        Some(file.relative.clone()),
                        details.join("; "),
                    ));
                }
            }
            Err(reason) => {
                findings.push(Finding::new(
                    Rule::NoSchema,
                    Some(file.relative.clone()),
                    format!("schema `{}` is unusable: {}", schema_rel.display(), reason),
                ));
                return;
            }
        }

        // Path-derived id is relative to the schema's directory.
        let expected_id = expected_id(&file.relative, &schema_rel);
        let actual_id = value.get("id").and_then(Value::as_str);
        if let (Some(expected), Some(actual)) = (&expected_id, actual_id) {
            if actual != expected {
                findings.push(Finding::new(
                    Rule::IdMismatch,
                    Some(file.relative.clone()),
                    format!("id `{actual}` does not match path-derived id `{expected}`"),
                ));
            }
        }
    }

    /// Walk upward from the file's directory to the repository root looking
    /// for `_schema.json`. Returns the schema's repo-relative path.
    fn locate_schema(&self, file_rel: &Path) -> Option<PathBuf> {
        let mut dir = file_rel.parent();
        while let Some(current) = dir {
            let candidate = current.join("_schema.json");
            if self.root.join(&candidate).is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    fn compiled(&mut self, schema_rel: &Path) -> &Result<JSONSchema, String> {
        if !self.cache.contains_key(schema_rel) {
            let entry = load_schema(&self.root.join(schema_rel));
            self.cache.insert(schema_rel.to_path_buf(), entry);
        }
        &self.cache[schema_rel]
    }
}

fn load_schema(path: &Path) -> Result<JSONSchema, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(&value)
        .map_err(|e| e.to_string())
}

fn expected_id(file_rel: &Path, schema_rel: &Path) -> Option<String> {
    let schema_dir = schema_rel.parent()?;
    let rel = file_rel.strip_prefix(schema_dir).ok()?;
    let rel = rel.to_str()?;
    Some(rel.strip_suffix(".json")?.replace('\\', "/"))
}
