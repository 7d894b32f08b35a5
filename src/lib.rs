pub mod artifact;
pub mod cascade;
pub mod change;
pub mod cli;
pub mod commands;
pub mod engine;
pub mod index;
pub mod model;
pub mod report;
pub mod store;
pub mod validate;

pub use artifact::{
    ArtifactError, ArtifactGenerator, BundleManifest, ModuleArtifact, BUNDLE_MANIFEST_SCHEMA,
    MODULE_ARTIFACT_SCHEMA,
};
pub use cascade::{
    load_overrides, run_cascade, CascadeOutcome, VersionPlan, ONTOLOGY_KEY, OVERRIDES_FILE,
};
pub use change::{classify_change, detect_changes, ChangeRecord, ChangeSet, Classification};
pub use commands::execute_command;
pub use engine::{
    analyze, apply_versions, AnalysisReport, AppliedVersions, ApplyError, EngineConfig,
    VERSION_FILE,
};
pub use index::{build_index, discover_entity_files, DiscoveredFile, EntityIndex};
pub use model::{
    max_bump, BumpClass, Bundle, Category, Entity, EntityType, Module, Property, Subobject,
    Template, Version,
};
pub use report::{assemble, Report};
pub use store::{FileStore, GitStore, OsFileStore, VersionedStore};
pub use validate::{validate_repository, Finding, Rule, Severity};
