//! Module version and version-constraint domain types.
//!
//! Versions are the host's dotted numeric form: two to four components
//! (`major.minor[.build[.revision]]`). This is deliberately not semver —
//! there is no prerelease or build-metadata grammar, and absent trailing
//! components sort *below* zero (`1.0 < 1.0.0`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// A module version with two to four numeric components.
///
/// Parsed from strings such as `"1.2"`, `"1.2.3"`, or `"1.2.3.4"`.
/// A single bare integer is rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u64,
    pub minor: u64,
    pub build: Option<u64>,
    pub revision: Option<u64>,
}

impl ModuleVersion {
    /// Create a two-component version.
    #[must_use]
    pub const fn new(major: u64, minor: u64) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Ordering key: absent components rank below zero.
    const fn key(&self) -> (u64, u64, i128, i128) {
        let build = match self.build {
            Some(b) => b as i128,
            None => -1,
        };
        let revision = match self.revision {
            Some(r) => r as i128,
            None => -1,
        };
        (self.major, self.minor, build, revision)
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{revision}")?;
        }
        Ok(())
    }
}

impl FromStr for ModuleVersion {
    type Err = ImportError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = || ImportError::MalformedVersion {
            text: text.to_string(),
        };

        let parts: Vec<&str> = text.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(malformed());
        }

        let mut components = [None; 4];
        for (i, part) in parts.iter().enumerate() {
            let value: u64 = part.parse().map_err(|_| malformed())?;
            components[i] = Some(value);
        }

        Ok(Self {
            major: components[0].ok_or_else(malformed)?,
            minor: components[1].ok_or_else(malformed)?,
            build: components[2],
            revision: components[3],
        })
    }
}

/// A version constraint: exact, bounded range, or unconstrained.
///
/// Built through the fallible constructors so invalid combinations
/// (exact together with a bound, minimum above maximum) are rejected
/// before any resolution work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstraint {
    required: Option<ModuleVersion>,
    minimum: Option<ModuleVersion>,
    maximum: Option<ModuleVersion>,
}

/// The unconstrained constraint (every candidate is compatible).
pub const ANY_VERSION: VersionConstraint = VersionConstraint {
    required: None,
    minimum: None,
    maximum: None,
};

impl Default for VersionConstraint {
    fn default() -> Self {
        ANY_VERSION
    }
}

impl VersionConstraint {
    /// Constrain to exactly one version.
    #[must_use]
    pub const fn exact(version: ModuleVersion) -> Self {
        Self {
            required: Some(version),
            minimum: None,
            maximum: None,
        }
    }

    /// Constrain to a bounded range. Either bound may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidSpecification`] when `minimum > maximum`.
    pub fn between(
        name: &str,
        minimum: Option<ModuleVersion>,
        maximum: Option<ModuleVersion>,
    ) -> Result<Self, ImportError> {
        if let (Some(min), Some(max)) = (minimum, maximum) {
            if min > max {
                return Err(ImportError::InvalidSpecification {
                    name: name.to_string(),
                    reason: format!("minimum version {min} is greater than maximum version {max}"),
                });
            }
        }
        Ok(Self {
            required: None,
            minimum,
            maximum,
        })
    }

    /// Whether this constraint accepts any version at all.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        self.required.is_none() && self.minimum.is_none() && self.maximum.is_none()
    }

    /// The exact required version, when this is an exact constraint.
    #[must_use]
    pub const fn required(&self) -> Option<ModuleVersion> {
        self.required
    }

    /// Decide whether a candidate version satisfies this constraint.
    ///
    /// `candidate` is `None` for version-less artifacts (anything that is
    /// not manifest-described and so declares no version). Version-less
    /// candidates pass the range rules vacuously; only an exact requirement
    /// can reject them.
    #[must_use]
    pub fn is_compatible(&self, candidate: Option<&ModuleVersion>) -> bool {
        if let Some(required) = &self.required {
            return candidate == Some(required);
        }
        let Some(candidate) = candidate else {
            return true;
        };
        match (&self.minimum, &self.maximum) {
            (Some(min), Some(max)) => min <= candidate && candidate <= max,
            (Some(min), None) => candidate >= min,
            (None, Some(max)) => candidate <= max,
            (None, None) => true,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(required) = &self.required {
            return write!(f, "={required}");
        }
        match (&self.minimum, &self.maximum) {
            (Some(min), Some(max)) => write!(f, ">={min},<={max}"),
            (Some(min), None) => write!(f, ">={min}"),
            (None, Some(max)) => write!(f, "<={max}"),
            (None, None) => write!(f, "*"),
        }
    }
}
