//! Repository validation: schema conformance, reference integrity, cycle
//! freedom, and orphan detection, run in that order against the entity
//! index. Each validator appends to one shared finding list; nothing stops
//! early, so a single run reports everything at once.

use std::path::Path;

pub mod cycles;
pub mod error;
pub mod orphans;
pub mod references;
pub mod rules;
pub mod schema;

pub use cycles::check_cycles;
pub use error::{Finding, Severity};
pub use orphans::check_orphans;
pub use references::{check_references, FieldShape, ModuleScope, ReferenceField, REFERENCE_FIELDS};
pub use rules::Rule;
pub use schema::SchemaValidator;

use crate::index::{DiscoveredFile, EntityIndex};

/// Run every validator over the repository, in component order.
pub fn validate_repository(
    root: &Path,
    files: &[DiscoveredFile],
    index: &EntityIndex,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    SchemaValidator::new(root).check_files(files, &mut findings);
    check_references(index, &mut findings);
    check_cycles(index, &mut findings);
    check_orphans(index, &mut findings);
    findings
}
