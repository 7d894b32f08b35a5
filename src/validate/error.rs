use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::rules::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic, anchored to the file it concerns when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub rule: Rule,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub message: String,
}

impl Finding {
    pub fn new(rule: Rule, file: impl Into<Option<PathBuf>>, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(
                f,
                "[{}] {}: {}",
                self.rule.code(),
                file.display(),
                self.message
            ),
            None => write!(f, "[{}] {}", self.rule.code(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_inherits_severity_from_its_rule() {
        let err = Finding::new(Rule::MissingReference, None, "x");
        assert!(err.is_error());
        let warn = Finding::new(Rule::OrphanedEntity, None, "x");
        assert!(!warn.is_error());
    }

    #[test]
    fn display_leads_with_the_wire_code() {
        let finding = Finding::new(
            Rule::IdMismatch,
            Some(PathBuf::from("properties/Name.json")),
            "id `Nom` does not match path-derived id `Name`",
        );
        let rendered = finding.to_string();
        assert!(rendered.starts_with("[id-mismatch] properties/Name.json:"));
    }
}
