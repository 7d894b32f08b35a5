//! Upward propagation of bump classes: owned changes to modules, modules
//! to dependent modules, modules to bundles, and finally to the ontology,
//! followed by manual overrides and new-version computation.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::debug;

use crate::change::{ChangeRecord, ChangeSet};
use crate::index::EntityIndex;
use crate::model::{max_bump, BumpClass, EntityType, Version};
use crate::validate::{Finding, Rule};

mod overrides;

pub use overrides::{load_overrides, ONTOLOGY_KEY, OVERRIDES_FILE};

/// Planned movement of one module or bundle version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionPlan {
    pub current: String,
    pub new: String,
    pub bump: BumpClass,
}

/// The full result of the cascade, in the shape reported on the wire.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub changes: Vec<ChangeRecord>,
    pub module_bumps: BTreeMap<String, BumpClass>,
    pub bundle_bumps: BTreeMap<String, BumpClass>,
    pub ontology_bump: Option<BumpClass>,
    pub orphan_changes: Vec<ChangeRecord>,
    pub overrides: BTreeMap<String, BumpClass>,
    pub override_warnings: Vec<String>,
    pub module_versions: BTreeMap<String, VersionPlan>,
    pub bundle_versions: BTreeMap<String, VersionPlan>,
}

/// Run the cascade over a detected change set. Warnings raised here
/// (`override-downgrade`, `version-bump-insufficient`) are appended to
/// `findings`; the cascade itself never fails.
pub fn run_cascade(
    index: &EntityIndex,
    change_set: &ChangeSet,
    overrides: BTreeMap<String, BumpClass>,
    findings: &mut Vec<Finding>,
) -> CascadeOutcome {
    let mut outcome = CascadeOutcome {
        changes: change_set.records.clone(),
        overrides,
        ..CascadeOutcome::default()
    };

    // Step 1: reverse index from claimed content to its owning module.
    let mut owner: HashMap<(EntityType, String), String> = HashMap::new();
    for (module_id, module) in &index.modules {
        for ty in EntityType::CONTENT {
            for content_id in module.contents_of(ty) {
                owner
                    .entry((ty, content_id.clone()))
                    .or_insert_with(|| module_id.clone());
            }
        }
    }

    // Step 2: aggregate owned changes per module. Edits to a module or
    // bundle file accrue to that module or bundle directly; content
    // changes no module claims are orphans and bump nothing.
    for record in &change_set.records {
        let id = record.entity_id();
        match record.entity_type {
            EntityType::Module => {
                bump_entry(&mut outcome.module_bumps, &id, record.class);
            }
            EntityType::Bundle => {
                bump_entry(&mut outcome.bundle_bumps, &id, record.class);
            }
            ty => match owner.get(&(ty, id.clone())) {
                Some(module_id) => {
                    bump_entry(&mut outcome.module_bumps, module_id, record.class);
                }
                None => outcome.orphan_changes.push(record.clone()),
            },
        }
    }

    // Step 3: cascade through module dependencies, leaves first. A cyclic
    // graph falls back to the un-cascaded map; the cycle detector already
    // reported it.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in index.modules.keys() {
        graph.add_node(id.as_str());
    }
    for (id, module) in &index.modules {
        for dep in &module.dependencies {
            if index.modules.contains_key(dep) {
                graph.add_edge(id.as_str(), dep.as_str(), ());
            }
        }
    }
    match toposort(&graph, None) {
        Ok(order) => {
            for module_id in order.into_iter().rev() {
                let module = &index.modules[module_id];
                let dep_bump = module
                    .dependencies
                    .iter()
                    .filter_map(|dep| outcome.module_bumps.get(dep.as_str()).copied())
                    .max();
                if let Some(dep_bump) = dep_bump {
                    bump_entry(&mut outcome.module_bumps, module_id, dep_bump);
                }
            }
        }
        Err(_) => {
            debug!("module dependency graph is cyclic; cascade skipped");
        }
    }

    // Step 4: bundles take the max over their bumped members.
    for (bundle_id, bundle) in &index.bundles {
        let member_bump = bundle
            .modules
            .iter()
            .filter_map(|m| outcome.module_bumps.get(m.as_str()).copied())
            .max();
        if let Some(member_bump) = member_bump {
            bump_entry(&mut outcome.bundle_bumps, bundle_id, member_bump);
        }
    }

    // Step 5: ontology bump. Orphan changes never raise it.
    outcome.ontology_bump = outcome
        .module_bumps
        .values()
        .chain(outcome.bundle_bumps.values())
        .copied()
        .max();

    apply_overrides(index, &mut outcome, findings);
    plan_versions(index, change_set, &mut outcome, findings);
    outcome
}

fn bump_entry(map: &mut BTreeMap<String, BumpClass>, id: &str, class: BumpClass) {
    let current = map.get(id).copied();
    map.insert(id.to_string(), max_bump(current, class));
}

/// Step 6: manual overrides. An override wins unconditionally, warning
/// when it lowers a computed bump. Overrides never cascade, and an
/// ontology override cannot conjure a bump out of zero detected changes.
fn apply_overrides(index: &EntityIndex, outcome: &mut CascadeOutcome, findings: &mut Vec<Finding>) {
    let overrides = outcome.overrides.clone();
    for (id, class) in overrides {
        if id == ONTOLOGY_KEY {
            match outcome.ontology_bump {
                Some(current) => {
                    if class < current {
                        downgrade_warning(&id, current, class, outcome, findings);
                    }
                    outcome.ontology_bump = Some(class);
                }
                None => {
                    let any_bump = !outcome.module_bumps.is_empty()
                        || !outcome.bundle_bumps.is_empty();
                    if any_bump {
                        outcome.ontology_bump = Some(class);
                    }
                }
            }
            continue;
        }

        if let Some(current) = outcome.module_bumps.get(&id).copied() {
            if class < current {
                downgrade_warning(&id, current, class, outcome, findings);
            }
            outcome.module_bumps.insert(id, class);
        } else if let Some(current) = outcome.bundle_bumps.get(&id).copied() {
            if class < current {
                downgrade_warning(&id, current, class, outcome, findings);
            }
            outcome.bundle_bumps.insert(id, class);
        } else if index.modules.contains_key(&id) {
            outcome.module_bumps.insert(id, class);
        } else if index.bundles.contains_key(&id) {
            outcome.bundle_bumps.insert(id, class);
        }
        // Overrides naming nothing known are inert.
    }
}

fn downgrade_warning(
    id: &str,
    current: BumpClass,
    class: BumpClass,
    outcome: &mut CascadeOutcome,
    findings: &mut Vec<Finding>,
) {
    let message = format!("override downgrades `{id}`: {current} -> {class}");
    outcome.override_warnings.push(message.clone());
    findings.push(Finding::new(Rule::OverrideDowngrade, None, message));
}

/// Step 7: new version strings. Entries whose current version is missing
/// or malformed are skipped. When the working tree pre-bumped a version
/// short of the requirement, warn.
fn plan_versions(
    index: &EntityIndex,
    change_set: &ChangeSet,
    outcome: &mut CascadeOutcome,
    findings: &mut Vec<Finding>,
) {
    for (id, class) in &outcome.module_bumps {
        let Some(module) = index.modules.get(id) else {
            continue;
        };
        if let Some(plan) = plan_one(module.version.as_deref(), *class) {
            check_prebump(
                id,
                "module",
                module.version.as_deref(),
                change_set.base_module_versions.get(id),
                *class,
                findings,
            );
            outcome.module_versions.insert(id.clone(), plan);
        }
    }
    for (id, class) in &outcome.bundle_bumps {
        let Some(bundle) = index.bundles.get(id) else {
            continue;
        };
        if let Some(plan) = plan_one(bundle.version.as_deref(), *class) {
            check_prebump(
                id,
                "bundle",
                bundle.version.as_deref(),
                change_set.base_bundle_versions.get(id),
                *class,
                findings,
            );
            outcome.bundle_versions.insert(id.clone(), plan);
        }
    }
}

fn plan_one(current: Option<&str>, bump: BumpClass) -> Option<VersionPlan> {
    let current = current?;
    let parsed: Version = current.parse().ok()?;
    Some(VersionPlan {
        current: current.to_string(),
        new: parsed.bumped(bump).to_string(),
        bump,
    })
}

fn check_prebump(
    id: &str,
    kind: &str,
    tree: Option<&str>,
    base: Option<&String>,
    required: BumpClass,
    findings: &mut Vec<Finding>,
) {
    let (Some(tree), Some(base)) = (tree, base) else {
        return;
    };
    let (Ok(tree_version), Ok(base_version)) =
        (tree.parse::<Version>(), base.parse::<Version>())
    else {
        return;
    };
    if tree_version != base_version && tree_version < base_version.bumped(required) {
        findings.push(Finding::new(
            Rule::VersionBumpInsufficient,
            None,
            format!(
                "{kind} `{id}` moved {base} -> {tree}, below the required {required} bump to {}",
                base_version.bumped(required)
            ),
        ));
    }
}
