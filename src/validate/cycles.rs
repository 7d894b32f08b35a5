//! Acyclicity checks for the three self-referential relations: category
//! `parents`, property `parent_property`, and module `dependencies`.
//!
//! Dangling references are not edges here; the reference validator already
//! reports them. Exactly one error is emitted per cyclic strongly-connected
//! component, naming a concrete cycle path.

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use super::error::Finding;
use super::rules::Rule;
use crate::index::EntityIndex;
use crate::model::EntityType;

struct Relation {
    rule: Rule,
    source: EntityType,
    label: &'static str,
}

const RELATIONS: [Relation; 3] = [
    Relation {
        rule: Rule::CircularCategoryInheritance,
        source: EntityType::Category,
        label: "category inheritance",
    },
    Relation {
        rule: Rule::CircularPropertyParent,
        source: EntityType::Property,
        label: "property parent chain",
    },
    Relation {
        rule: Rule::CircularModuleDependency,
        source: EntityType::Module,
        label: "module dependencies",
    },
];

pub fn check_cycles(index: &EntityIndex, findings: &mut Vec<Finding>) {
    for relation in &RELATIONS {
        let graph = build_graph(index, relation.source);
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || (component.len() == 1
                    && graph.contains_edge(component[0], component[0]));
            if !is_cycle {
                continue;
            }
            let path = cycle_path(&graph, &component);
            let anchor = index
                .path_of(relation.source, path[0])
                .map(|p| p.to_path_buf());
            findings.push(Finding::new(
                relation.rule,
                anchor,
                format!("{} form a cycle: {}", relation.label, path.join(" -> ")),
            ));
        }
    }
}

fn build_graph<'a>(index: &'a EntityIndex, source: EntityType) -> DiGraphMap<&'a str, ()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    match source {
        EntityType::Category => {
            for id in index.categories.keys() {
                graph.add_node(id.as_str());
            }
            for (id, category) in &index.categories {
                for parent in &category.parents {
                    if index.categories.contains_key(parent) {
                        graph.add_edge(id.as_str(), parent.as_str(), ());
                    }
                }
            }
        }
        EntityType::Property => {
            for id in index.properties.keys() {
                graph.add_node(id.as_str());
            }
            for (id, property) in &index.properties {
                if let Some(parent) = &property.parent_property {
                    if index.properties.contains_key(parent) {
                        graph.add_edge(id.as_str(), parent.as_str(), ());
                    }
                }
            }
        }
        EntityType::Module => {
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
        }
        _ => {}
    }
    graph
}

/// A concrete cyclic walk through the component, closed back onto its
/// starting node. Starts from the lexicographically smallest member so the
/// report is stable across runs.
fn cycle_path<'a>(graph: &DiGraphMap<&'a str, ()>, component: &[&'a str]) -> Vec<&'a str> {
    let members: HashSet<&str> = component.iter().copied().collect();
    let start = *component.iter().min().expect("component is non-empty");

    // Depth-first search within the component until an edge returns to the
    // start node. Every node of a cyclic SCC lies on such a walk.
    let mut stack = vec![(start, vec![start])];
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some((node, path)) = stack.pop() {
        let mut neighbors: Vec<&str> = graph
            .neighbors(node)
            .filter(|n| members.contains(n))
            .collect();
        neighbors.sort_unstable();
        for next in neighbors {
            if next == start {
                let mut cycle = path.clone();
                cycle.push(start);
                return cycle;
            }
            if visited.insert(next) {
                let mut longer = path.clone();
                longer.push(next);
                stack.push((next, longer));
            }
        }
    }
    // unreachable for a cyclic SCC; fall back to the sorted member list
    let mut fallback: Vec<&str> = component.to_vec();
    fallback.sort_unstable();
    fallback.push(fallback[0]);
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_index, discover_entity_files};
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn findings_for(root: &Path) -> Vec<Finding> {
        let index = build_index(&discover_entity_files(root));
        let mut findings = Vec::new();
        check_cycles(&index, &mut findings);
        findings
    }

    #[test]
    fn reports_one_error_per_cyclic_component() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "categories/A.json",
            r#"{"id": "A", "label": "A", "parents": ["B"]}"#,
        );
        write(
            dir.path(),
            "categories/B.json",
            r#"{"id": "B", "label": "B", "parents": ["A"]}"#,
        );
        write(
            dir.path(),
            "categories/C.json",
            r#"{"id": "C", "label": "C", "parents": ["A"]}"#,
        );
        let findings = findings_for(dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::CircularCategoryInheritance);
        assert!(findings[0].message.contains("A -> B -> A"));
    }

    #[test]
    fn a_self_loop_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "properties/Narrow.json",
            r#"{"id": "Narrow", "label": "", "datatype": "Text", "parent_property": "Narrow"}"#,
        );
        let findings = findings_for(dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::CircularPropertyParent);
        assert!(findings[0].message.contains("Narrow -> Narrow"));
    }

    #[test]
    fn dangling_references_are_not_edges() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "modules/Core.json",
            r#"{"id": "Core", "label": "", "version": "1.0.0", "dependencies": ["Ghost"]}"#,
        );
        assert!(findings_for(dir.path()).is_empty());
    }

    #[test]
    fn module_dependency_cycle_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "modules/A.json",
            r#"{"id": "A", "label": "", "version": "1.0.0", "dependencies": ["B"]}"#,
        );
        write(
            dir.path(),
            "modules/B.json",
            r#"{"id": "B", "label": "", "version": "1.0.0", "dependencies": ["A"]}"#,
        );
        let findings = findings_for(dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::CircularModuleDependency);
    }
}
