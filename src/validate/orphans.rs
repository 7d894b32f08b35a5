//! Warnings for content-bearing entities no module claims.

use super::error::Finding;
use super::references::ModuleScope;
use super::rules::Rule;
use crate::index::EntityIndex;
use crate::model::EntityType;

pub fn check_orphans(index: &EntityIndex, findings: &mut Vec<Finding>) {
    let scope = ModuleScope::build(index);
    for ty in EntityType::CONTENT {
        for id in index.ids(ty) {
            if scope.owner_of(ty, id).is_none() {
                findings.push(Finding::new(
                    Rule::OrphanedEntity,
                    index.path_of(ty, id).map(|p| p.to_path_buf()),
                    format!("{} `{}` is not claimed by any module", ty.singular(), id),
                ));
            }
        }
    }
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

    #[test]
    fn unclaimed_entities_warn_but_modules_never_do() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "properties/Claimed.json",
            r#"{"id": "Claimed", "label": "", "datatype": "Text"}"#,
        );
        write(
            dir.path(),
            "properties/Loose.json",
            r#"{"id": "Loose", "label": "", "datatype": "Text"}"#,
        );
        write(
            dir.path(),
            "modules/Core.json",
            r#"{"id": "Core", "label": "", "version": "1.0.0", "properties": ["Claimed"]}"#,
        );
        write(
            dir.path(),
            "bundles/Default.json",
            r#"{"id": "Default", "label": "", "version": "1.0.0", "modules": ["Core"]}"#,
        );
        let index = build_index(&discover_entity_files(dir.path()));
        let mut findings = Vec::new();
        check_orphans(&index, &mut findings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::OrphanedEntity);
        assert!(findings[0].message.contains("`Loose`"));
        assert!(!findings[0].is_error());
    }
}
