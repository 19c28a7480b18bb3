//! Fully-qualified module specifications.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::version::{ModuleVersion, VersionConstraint};
use crate::error::ImportError;

/// A symbolic module reference: a name plus optional identity constraints.
///
/// Construction enforces the specification invariants up front: an exact
/// required version is mutually exclusive with the range bounds, and the
/// range itself must be ordered. Callers therefore never see a half-valid
/// specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpecification {
    name: String,
    guid: Option<Uuid>,
    constraint: VersionConstraint,
}

impl ModuleSpecification {
    /// A bare-name specification with no version or GUID constraint.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: None,
            constraint: VersionConstraint::default(),
        }
    }

    /// Build a specification from its raw parts.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidSpecification`] when `required_version`
    /// is combined with either bound, or when `minimum_version` exceeds
    /// `maximum_version`.
    pub fn new(
        name: impl Into<String>,
        guid: Option<Uuid>,
        required_version: Option<ModuleVersion>,
        minimum_version: Option<ModuleVersion>,
        maximum_version: Option<ModuleVersion>,
    ) -> Result<Self, ImportError> {
        let name = name.into();
        let constraint = match required_version {
            Some(required) => {
                if minimum_version.is_some() || maximum_version.is_some() {
                    return Err(ImportError::InvalidSpecification {
                        name,
                        reason: "a required version cannot be combined with a minimum or maximum \
                                 version"
                            .to_string(),
                    });
                }
                VersionConstraint::exact(required)
            }
            None => VersionConstraint::between(&name, minimum_version, maximum_version)?,
        };
        Ok(Self {
            name,
            guid,
            constraint,
        })
    }

    /// The module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The required module GUID, when pinned.
    #[must_use]
    pub const fn guid(&self) -> Option<Uuid> {
        self.guid
    }

    /// The version constraint derived from the specification fields.
    #[must_use]
    pub const fn constraint(&self) -> &VersionConstraint {
        &self.constraint
    }

    /// Whether a loaded artifact's identity satisfies this specification.
    #[must_use]
    pub fn matches(&self, version: Option<&ModuleVersion>, guid: Option<Uuid>) -> bool {
        if let Some(required_guid) = self.guid {
            if guid != Some(required_guid) {
                return false;
            }
        }
        self.constraint.is_compatible(version)
    }
}

impl fmt::Display for ModuleSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.constraint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> ModuleVersion {
        text.parse().unwrap()
    }

    #[test]
    fn required_version_excludes_bounds() {
        let err = ModuleSpecification::new("Disk", None, Some(v("1.0")), Some(v("0.5")), None)
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSpecification { .. }));

        let err = ModuleSpecification::new("Disk", None, Some(v("1.0")), None, Some(v("2.0")))
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSpecification { .. }));
    }

    #[test]
    fn inverted_bounds_fail_fast() {
        let err = ModuleSpecification::new("Disk", None, None, Some(v("2.0")), Some(v("1.0")))
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSpecification { .. }));
    }

    #[test]
    fn guid_pin_must_match() {
        let guid = Uuid::new_v4();
        let spec = ModuleSpecification::new("Disk", Some(guid), None, None, None).unwrap();
        assert!(spec.matches(None, Some(guid)));
        assert!(!spec.matches(None, Some(Uuid::new_v4())));
        assert!(!spec.matches(None, None));
    }

    #[test]
    fn bare_name_matches_anything() {
        let spec = ModuleSpecification::by_name("Disk");
        assert!(spec.matches(None, None));
        assert!(spec.matches(Some(&v("9.9")), Some(Uuid::new_v4())));
    }
}
