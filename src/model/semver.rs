use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `major.minor.patch` triple. No prefix, no pre-release tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Increment the component named by `bump` and reset all lower ones.
    pub fn bumped(self, bump: BumpClass) -> Version {
        match bump {
            BumpClass::Major => Version::new(self.major + 1, 0, 0),
            BumpClass::Minor => Version::new(self.major, self.minor + 1, 0),
            BumpClass::Patch => Version::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed version `{0}`: expected `major.minor.patch`")]
pub struct VersionParseError(pub String);

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut component = |_name: &str| -> Result<u64, VersionParseError> {
            parts
                .next()
                .and_then(|p| {
                    // reject empty / signed / whitespace-padded components
                    if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                        None
                    } else {
                        p.parse().ok()
                    }
                })
                .ok_or_else(|| VersionParseError(s.to_string()))
        };
        let major = component("major")?;
        let minor = component("minor")?;
        let patch = component("patch")?;
        if parts.next().is_some() {
            return Err(VersionParseError(s.to_string()));
        }
        Ok(Version::new(major, minor, patch))
    }
}

/// How far a semantic version must move. `Major > Minor > Patch`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BumpClass {
    Patch,
    Minor,
    Major,
}

impl BumpClass {
    /// Wire priority: `major` 3, `minor` 2, `patch` 1.
    pub fn priority(self) -> u8 {
        match self {
            BumpClass::Major => 3,
            BumpClass::Minor => 2,
            BumpClass::Patch => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BumpClass::Major => "major",
            BumpClass::Minor => "minor",
            BumpClass::Patch => "patch",
        }
    }

    pub fn parse(s: &str) -> Option<BumpClass> {
        match s {
            "major" => Some(BumpClass::Major),
            "minor" => Some(BumpClass::Minor),
            "patch" => Some(BumpClass::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for BumpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Max by priority. `None` acts as the identity.
pub fn max_bump(a: Option<BumpClass>, b: BumpClass) -> BumpClass {
    match a {
        Some(a) if a >= b => a,
        _ => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_triples() {
        assert_eq!("1.2.3".parse::<Version>().unwrap(), Version::new(1, 2, 3));
        assert_eq!("0.0.0".parse::<Version>().unwrap(), Version::new(0, 0, 0));
    }

    #[test]
    fn rejects_prefixes_and_extras() {
        assert!("v1.2.3".parse::<Version>().is_err());
        assert!("1.2".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("1.2.-3".parse::<Version>().is_err());
        assert!("1.2. 3".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn bump_resets_lower_components() {
        let v = Version::new(1, 4, 9);
        assert_eq!(v.bumped(BumpClass::Patch), Version::new(1, 4, 10));
        assert_eq!(v.bumped(BumpClass::Minor), Version::new(1, 5, 0));
        assert_eq!(v.bumped(BumpClass::Major), Version::new(2, 0, 0));
    }

    #[test]
    fn patch_then_bump_never_precedes_plain_bump() {
        let v = Version::new(2, 3, 4);
        for bump in [BumpClass::Patch, BumpClass::Minor, BumpClass::Major] {
            assert!(v.bumped(BumpClass::Patch).bumped(bump) >= v.bumped(bump));
        }
    }

    #[test]
    fn bump_class_order_follows_priority() {
        assert!(BumpClass::Major > BumpClass::Minor);
        assert!(BumpClass::Minor > BumpClass::Patch);
        assert_eq!(BumpClass::Major.priority(), 3);
        assert_eq!(BumpClass::Patch.priority(), 1);
    }

    #[test]
    fn max_bump_is_idempotent_and_commutative() {
        let classes = [BumpClass::Patch, BumpClass::Minor, BumpClass::Major];
        for a in classes {
            assert_eq!(max_bump(Some(a), a), a);
            for b in classes {
                assert_eq!(max_bump(Some(a), b), max_bump(Some(b), a));
            }
        }
        // identity
        assert_eq!(max_bump(None, BumpClass::Patch), BumpClass::Patch);
    }

    #[test]
    fn wire_strings_round_trip() {
        for class in [BumpClass::Patch, BumpClass::Minor, BumpClass::Major] {
            assert_eq!(BumpClass::parse(class.as_str()), Some(class));
            let json = serde_json::to_string(&class).unwrap();
            assert_eq!(json, format!("\"{}\"", class.as_str()));
        }
        assert_eq!(BumpClass::parse("MAJOR"), None);
    }
}
