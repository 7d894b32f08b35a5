//! Stage orchestration: index, validate, detect changes, cascade, report.
//! Each stage produces a value the next consumes; nothing here mutates
//! data a later stage has already read.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::{ArtifactError, ArtifactGenerator};
use crate::cascade::{load_overrides, run_cascade, CascadeOutcome, OVERRIDES_FILE};
use crate::change::detect_changes;
use crate::index::{build_index, discover_entity_files};
use crate::model::{EntityType, Version};
use crate::report::{self, Report};
use crate::store::{FileStore, VersionedStore};
use crate::validate::{validate_repository, Finding, Rule};

pub const VERSION_FILE: &str = "VERSION";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Repository root.
    pub root: PathBuf,
    /// Base revision for change detection; without one, validation runs
    /// alone and no bumps are computed.
    pub base: Option<String>,
    /// Optional append-only summary sink.
    pub summary: Option<PathBuf>,
}

/// Everything one invocation learned about the repository.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub ok: bool,
    /// The repository-level version, when `VERSION` is present and well
    /// formed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_version: Option<String>,
    pub report: Report,
    /// Present when a base revision was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CascadeOutcome>,
}

/// Run the full pipeline. Validation always runs; change detection and
/// the cascade run only against a base revision.
pub fn analyze(
    config: &EngineConfig,
    working: &dyn FileStore,
    history: &dyn VersionedStore,
) -> AnalysisReport {
    info!(root = %config.root.display(), "analyzing repository");
    let files = discover_entity_files(&config.root);
    let index = build_index(&files);
    debug!(files = files.len(), entities = index.len(), "index ready");

    let mut findings = validate_repository(&config.root, &files, &index);
    let ontology_version = check_version_file(working, &mut findings);

    let analysis = config.base.as_deref().map(|base| {
        let change_set = detect_changes(history, working, base);
        let overrides = load_overrides(working);
        run_cascade(&index, &change_set, overrides, &mut findings)
    });

    let report = report::assemble(&findings);
    if let Some(summary) = &config.summary {
        if let Err(err) = report::append_summary(summary, &report) {
            tracing::warn!(path = %summary.display(), "summary sink unwritable: {err}");
        }
    }
    AnalysisReport {
        ok: report.is_clean(),
        ontology_version,
        report,
        analysis,
    }
}

/// `VERSION` at the root: a single trimmed semver string, no prefix.
fn check_version_file(working: &dyn FileStore, findings: &mut Vec<Finding>) -> Option<String> {
    let Ok(bytes) = working.read(Path::new(VERSION_FILE)) else {
        findings.push(Finding::new(
            Rule::MissingVersion,
            None,
            "VERSION file is missing from the repository root",
        ));
        return None;
    };
    let raw = String::from_utf8_lossy(&bytes).trim().to_string();
    match raw.parse::<Version>() {
        Ok(_) => Some(raw),
        Err(_) => {
            findings.push(Finding::new(
                Rule::InvalidVersion,
                None,
                format!("VERSION file holds `{raw}`, which is not a plain semver triple"),
            ));
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("validation failed with {errors} error(s); refusing to apply versions")]
    ValidationFailed { errors: usize },
    #[error("a base revision is required to apply versions")]
    MissingBase,
    #[error("VERSION file is missing or malformed")]
    BadVersionFile,
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("failed to rewrite `{}`: {source}", path.display())]
    Rewrite {
        path: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedVersions {
    pub ontology: Option<MovedVersion>,
    pub modules: Vec<MovedVersion>,
    pub bundles: Vec<MovedVersion>,
    pub artifacts: Vec<PathBuf>,
    pub overrides_consumed: bool,
}

#[derive(Debug, Serialize)]
pub struct MovedVersion {
    pub id: String,
    pub current: String,
    pub new: String,
}

/// Write the computed versions into entity files and `VERSION`, emit
/// versioned artifacts, and consume `VERSION_OVERRIDES.json`. Refuses to
/// touch anything while validation reports errors.
pub fn apply_versions(
    config: &EngineConfig,
    working: &dyn FileStore,
    history: &dyn VersionedStore,
) -> Result<(AnalysisReport, AppliedVersions), ApplyError> {
    if config.base.is_none() {
        return Err(ApplyError::MissingBase);
    }
    let analysis_report = analyze(config, working, history);
    if !analysis_report.ok {
        return Err(ApplyError::ValidationFailed {
            errors: analysis_report.report.errors,
        });
    }
    let Some(current_ontology) = analysis_report.ontology_version.clone() else {
        return Err(ApplyError::BadVersionFile);
    };
    let outcome = analysis_report
        .analysis
        .as_ref()
        .expect("analysis present: base revision was given");

    // Re-derive the index for artifact content; validation above
    // guarantees it is coherent.
    let files = discover_entity_files(&config.root);
    let index = build_index(&files);
    let generator = ArtifactGenerator::new();

    let mut applied = AppliedVersions {
        ontology: None,
        modules: Vec::new(),
        bundles: Vec::new(),
        artifacts: Vec::new(),
        overrides_consumed: false,
    };

    for (id, plan) in &outcome.module_versions {
        let path = index
            .path_of(EntityType::Module, id)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("modules").join(format!("{id}.json")));
        rewrite_version(working, &path, &plan.new)?;
        applied.modules.push(MovedVersion {
            id: id.clone(),
            current: plan.current.clone(),
            new: plan.new.clone(),
        });
        applied
            .artifacts
            .push(generator.write_module(working, &index, id, &plan.new)?);
    }

    let new_ontology = match outcome.ontology_bump {
        Some(bump) => {
            let parsed: Version = current_ontology
                .parse()
                .map_err(|_| ApplyError::BadVersionFile)?;
            let new = parsed.bumped(bump).to_string();
            working
                .write(Path::new(VERSION_FILE), format!("{new}\n").as_bytes())
                .map_err(|source| ApplyError::Rewrite {
                    path: PathBuf::from(VERSION_FILE),
                    source,
                })?;
            applied.ontology = Some(MovedVersion {
                id: "ontology".to_string(),
                current: current_ontology.clone(),
                new: new.clone(),
            });
            new
        }
        None => current_ontology.clone(),
    };

    for (id, plan) in &outcome.bundle_versions {
        let path = index
            .path_of(EntityType::Bundle, id)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("bundles").join(format!("{id}.json")));
        rewrite_version(working, &path, &plan.new)?;
        applied.bundles.push(MovedVersion {
            id: id.clone(),
            current: plan.current.clone(),
            new: plan.new.clone(),
        });
        applied.artifacts.push(generator.write_bundle(
            working,
            &index,
            id,
            &plan.new,
            &new_ontology,
        )?);
    }

    if working.exists(Path::new(OVERRIDES_FILE)) {
        working
            .remove(Path::new(OVERRIDES_FILE))
            .map_err(|source| ApplyError::Rewrite {
                path: PathBuf::from(OVERRIDES_FILE),
                source,
            })?;
        applied.overrides_consumed = true;
    }

    info!(
        modules = applied.modules.len(),
        bundles = applied.bundles.len(),
        "versions applied"
    );
    Ok((analysis_report, applied))
}

/// Rewrite one entity file's `version` in place, preserving every other
/// field verbatim.
fn rewrite_version(
    working: &dyn FileStore,
    path: &Path,
    new_version: &str,
) -> Result<(), ApplyError> {
    let bytes = working.read(path).map_err(|source| ApplyError::Rewrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut value: Value = serde_json::from_slice(&bytes)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("version".to_string(), Value::String(new_version.to_string()));
    }
    let mut rendered = serde_json::to_string_pretty(&value)?;
    rendered.push('\n');
    working
        .write(path, rendered.as_bytes())
        .map_err(|source| ApplyError::Rewrite {
            path: path.to_path_buf(),
            source,
        })
}
