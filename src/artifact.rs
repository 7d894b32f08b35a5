//! Versioned release artifacts: self-contained module artifacts and bundle
//! manifests, written under `<kind>/<id>/versions/<version>.json`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::index::EntityIndex;
use crate::store::FileStore;

pub const MODULE_ARTIFACT_SCHEMA: &str =
    "https://ontoci.dev/schemas/module-artifact/v1.json";
pub const BUNDLE_MANIFEST_SCHEMA: &str =
    "https://ontoci.dev/schemas/bundle-manifest/v1.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("module `{0}` is not in the index")]
    UnknownModule(String),
    #[error("bundle `{0}` is not in the index")]
    UnknownBundle(String),
    #[error("module `{module}` lists missing {kind} `{id}`")]
    MissingContent {
        module: String,
        kind: &'static str,
        id: String,
    },
    #[error("module `{module}` depends on missing module `{dependency}`")]
    MissingDependency { module: String, dependency: String },
    #[error("module `{module}` depends on `{dependency}`, which has no version")]
    UnversionedDependency { module: String, dependency: String },
    #[error("bundle `{bundle}` includes missing module `{module}`")]
    MissingBundleModule { bundle: String, module: String },
    #[error("bundle `{bundle}` includes `{module}`, which has no version")]
    UnversionedBundleModule { bundle: String, module: String },
    #[error("failed to write artifact: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// A module at one version, with the full content of every entity it
/// claims. Source paths are bookkeeping and are already absent from the
/// serialized entities.
#[derive(Debug, Serialize)]
pub struct ModuleArtifact {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub id: String,
    pub version: String,
    pub generated: String,
    pub dependencies: BTreeMap<String, String>,
    pub categories: Vec<Value>,
    pub properties: Vec<Value>,
    pub subobjects: Vec<Value>,
    pub templates: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BundleManifest {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub id: String,
    pub version: String,
    pub generated: String,
    #[serde(rename = "ontologyVersion")]
    pub ontology_version: String,
    pub modules: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Emits artifacts stamped with one generation timestamp per run.
pub struct ArtifactGenerator {
    generated: String,
}

impl ArtifactGenerator {
    pub fn new() -> Self {
        Self {
            generated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn with_timestamp(generated: impl Into<String>) -> Self {
        Self {
            generated: generated.into(),
        }
    }

    pub fn module_artifact(
        &self,
        index: &EntityIndex,
        module_id: &str,
        version: &str,
    ) -> Result<ModuleArtifact, ArtifactError> {
        let module = index
            .modules
            .get(module_id)
            .ok_or_else(|| ArtifactError::UnknownModule(module_id.to_string()))?;

        let mut dependencies = BTreeMap::new();
        for dependency in &module.dependencies {
            let dep = index.modules.get(dependency).ok_or_else(|| {
                ArtifactError::MissingDependency {
                    module: module_id.to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            let dep_version =
                dep.version
                    .clone()
                    .ok_or_else(|| ArtifactError::UnversionedDependency {
                        module: module_id.to_string(),
                        dependency: dependency.clone(),
                    })?;
            dependencies.insert(dependency.clone(), dep_version);
        }

        Ok(ModuleArtifact {
            schema: MODULE_ARTIFACT_SCHEMA,
            id: module_id.to_string(),
            version: version.to_string(),
            generated: self.generated.clone(),
            dependencies,
            categories: collect(module_id, "category", &module.categories, |id| {
                index.categories.get(id).map(serde_json::to_value)
            })?,
            properties: collect(module_id, "property", &module.properties, |id| {
                index.properties.get(id).map(serde_json::to_value)
            })?,
            subobjects: collect(module_id, "subobject", &module.subobjects, |id| {
                index.subobjects.get(id).map(serde_json::to_value)
            })?,
            templates: collect(module_id, "template", &module.templates, |id| {
                index.templates.get(id).map(serde_json::to_value)
            })?,
        })
    }

    pub fn bundle_manifest(
        &self,
        index: &EntityIndex,
        bundle_id: &str,
        version: &str,
        ontology_version: &str,
    ) -> Result<BundleManifest, ArtifactError> {
        let bundle = index
            .bundles
            .get(bundle_id)
            .ok_or_else(|| ArtifactError::UnknownBundle(bundle_id.to_string()))?;

        let mut modules = BTreeMap::new();
        for module_id in &bundle.modules {
            let module = index.modules.get(module_id).ok_or_else(|| {
                ArtifactError::MissingBundleModule {
                    bundle: bundle_id.to_string(),
                    module: module_id.clone(),
                }
            })?;
            let module_version =
                module
                    .version
                    .clone()
                    .ok_or_else(|| ArtifactError::UnversionedBundleModule {
                        bundle: bundle_id.to_string(),
                        module: module_id.clone(),
                    })?;
            modules.insert(module_id.clone(), module_version);
        }

        Ok(BundleManifest {
            schema: BUNDLE_MANIFEST_SCHEMA,
            id: bundle_id.to_string(),
            version: version.to_string(),
            generated: self.generated.clone(),
            ontology_version: ontology_version.to_string(),
            modules,
            description: bundle.description.clone(),
        })
    }

    /// Emit a module artifact to `modules/<id>/versions/<version>.json`.
    /// Returns the repo-relative path written.
    pub fn write_module(
        &self,
        store: &dyn FileStore,
        index: &EntityIndex,
        module_id: &str,
        version: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let artifact = self.module_artifact(index, module_id, version)?;
        let path = PathBuf::from("modules")
            .join(module_id)
            .join("versions")
            .join(format!("{version}.json"));
        write_pretty(store, &path, &artifact)?;
        Ok(path)
    }

    /// Emit a bundle manifest to `bundles/<id>/versions/<version>.json`.
    pub fn write_bundle(
        &self,
        store: &dyn FileStore,
        index: &EntityIndex,
        bundle_id: &str,
        version: &str,
        ontology_version: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let manifest = self.bundle_manifest(index, bundle_id, version, ontology_version)?;
        let path = PathBuf::from("bundles")
            .join(bundle_id)
            .join("versions")
            .join(format!("{version}.json"));
        write_pretty(store, &path, &manifest)?;
        Ok(path)
    }
}

impl Default for ArtifactGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn collect<F>(
    module_id: &str,
    kind: &'static str,
    ids: &[String],
    lookup: F,
) -> Result<Vec<Value>, ArtifactError>
where
    F: Fn(&str) -> Option<Result<Value, serde_json::Error>>,
{
    let mut values = Vec::with_capacity(ids.len());
    for id in ids {
        let value = lookup(id).ok_or_else(|| ArtifactError::MissingContent {
            module: module_id.to_string(),
            kind,
            id: id.clone(),
        })??;
        values.push(value);
    }
    Ok(values)
}

/// Pretty-printed, 2-space indent, trailing newline.
fn write_pretty<T: Serialize>(
    store: &dyn FileStore,
    path: &Path,
    value: &T,
) -> Result<(), ArtifactError> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    store.write(path, rendered.as_bytes())?;
    Ok(())
}
