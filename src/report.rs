//! Turns the flat finding list into the grouped, machine-readable report.
//!
//! Pure, except for the optional append-only summary sink.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::validate::Finding;

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub errors: usize,
    pub warnings: usize,
    /// Findings grouped by file, in order of first appearance. Component
    /// order is preserved within each group.
    pub files: Vec<FileReport>,
    /// Findings not anchored to any file.
    pub general: Vec<Finding>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

pub fn assemble(findings: &[Finding]) -> Report {
    let errors = findings.iter().filter(|f| f.is_error()).count();
    let warnings = findings.len() - errors;

    let mut files: Vec<FileReport> = Vec::new();
    let mut general = Vec::new();
    for finding in findings {
        match &finding.file {
            Some(path) => {
                let key = path.to_string_lossy().replace('\\', "/");
                match files.iter_mut().find(|group| group.file == key) {
                    Some(group) => group.findings.push(finding.clone()),
                    None => files.push(FileReport {
                        file: key,
                        findings: vec![finding.clone()],
                    }),
                }
            }
            None => general.push(finding.clone()),
        }
    }
    Report {
        errors,
        warnings,
        files,
        general,
    }
}

/// Append one compact JSON line describing the run to the summary sink.
pub fn append_summary(path: &Path, report: &Report) -> io::Result<()> {
    let mut line = serde_json::to_string(report)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Rule;
    use std::path::PathBuf;

    fn finding(rule: Rule, file: Option<&str>, message: &str) -> Finding {
        Finding::new(rule, file.map(PathBuf::from), message)
    }

    #[test]
    fn groups_by_file_in_first_appearance_order() {
        let findings = vec![
            finding(Rule::Schema, Some("properties/B.json"), "one"),
            finding(Rule::MissingReference, Some("categories/A.json"), "two"),
            finding(Rule::OrphanedEntity, Some("properties/B.json"), "three"),
            finding(Rule::MissingVersion, None, "four"),
        ];
        let report = assemble(&findings);
        assert_eq!(report.errors, 3);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].file, "properties/B.json");
        assert_eq!(report.files[0].findings.len(), 2);
        assert_eq!(report.files[1].file, "categories/A.json");
        assert_eq!(report.general.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn summary_sink_appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("summary.jsonl");
        let report = assemble(&[finding(Rule::Parse, Some("properties/X.json"), "bad")]);
        append_summary(&sink, &report).unwrap();
        append_summary(&sink, &report).unwrap();
        let contents = std::fs::read_to_string(&sink).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["errors"], 1);
    }
}
