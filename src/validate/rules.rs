use serde::Serialize;

use super::error::Severity;

/// Every diagnostic the engine can raise, with its wire code and severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Parse,
    NoSchema,
    Schema,
    IdMismatch,
    MissingReference,
    SelfReference,
    ScopeViolation,
    PropertyConflict,
    SubobjectConflict,
    CircularCategoryInheritance,
    CircularModuleDependency,
    CircularPropertyParent,
    MissingVersion,
    InvalidVersion,
    OrphanedEntity,
    VersionBumpInsufficient,
    OverrideDowngrade,
}

impl Rule {
    /// The stable code reported on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Rule::Parse => "parse",
            Rule::NoSchema => "no-schema",
            Rule::Schema => "schema",
            Rule::IdMismatch => "id-mismatch",
            Rule::MissingReference => "missing-reference",
            Rule::SelfReference => "self-reference",
            Rule::ScopeViolation => "scope-violation",
            Rule::PropertyConflict => "property-conflict",
            Rule::SubobjectConflict => "subobject-conflict",
            Rule::CircularCategoryInheritance => "circular-category-inheritance",
            Rule::CircularModuleDependency => "circular-module-dependency",
            Rule::CircularPropertyParent => "circular-property-parent_property",
            Rule::MissingVersion => "missing-version",
            Rule::InvalidVersion => "invalid-version",
            Rule::OrphanedEntity => "orphaned-entity",
            Rule::VersionBumpInsufficient => "version-bump-insufficient",
            Rule::OverrideDowngrade => "override-downgrade",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Rule::OrphanedEntity | Rule::VersionBumpInsufficient | Rule::OverrideDowngrade => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl Serialize for Rule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_the_wire_strings() {
        assert_eq!(Rule::IdMismatch.code(), "id-mismatch");
        assert_eq!(
            Rule::CircularPropertyParent.code(),
            "circular-property-parent_property"
        );
        assert_eq!(Rule::OverrideDowngrade.code(), "override-downgrade");
    }

    #[test]
    fn only_the_three_informational_rules_warn() {
        let warnings = [
            Rule::OrphanedEntity,
            Rule::VersionBumpInsufficient,
            Rule::OverrideDowngrade,
        ];
        for rule in warnings {
            assert_eq!(rule.severity(), Severity::Warning);
        }
        assert_eq!(Rule::Parse.severity(), Severity::Error);
        assert_eq!(Rule::ScopeViolation.severity(), Severity::Error);
    }
}
