//! Engine-wide error taxonomy.
//!
//! Every failure surfaced by the engine carries a stable category plus the
//! offending identifier. Internal errors (manifest parsing, transport) are
//! mapped into this taxonomy at crate boundaries.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::manifest::ManifestError;
use crate::domain::version::VersionConstraint;

/// A transport-level failure reported by an opaque remote handle.
///
/// The engine does not interpret the underlying cause; it wraps the failure
/// with the module identifier for context and passes the message through.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced while resolving or importing modules.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No candidate artifact resolved for the name.
    #[error("no module named '{name}' was found on the module path")]
    NotFound { name: String },

    /// Candidates existed, but none satisfied the version constraint.
    #[error("module '{name}' was found, but no version satisfied the constraint {constraint}")]
    NoMatchingVersion {
        name: String,
        constraint: VersionConstraint,
    },

    /// A version string failed to parse.
    #[error("malformed version string '{text}'")]
    MalformedVersion { text: String },

    /// A module specification violated its construction invariants.
    #[error("invalid specification for module '{name}': {reason}")]
    InvalidSpecification { name: String, reason: String },

    /// A remote proxy-generation step produced zero artifacts.
    #[error("remote import of '{name}' produced no artifacts")]
    NothingToImport { name: String },

    /// A nested module declared a cmdlet adapter the engine does not support.
    #[error("module '{module}' declares unsupported cmdlet adapter '{adapter}'")]
    UnsupportedAdapter { module: String, adapter: String },

    /// The module manifest could not be parsed or interpreted.
    #[error("failed to read manifest for '{name}': {source}")]
    ManifestParse {
        name: String,
        #[source]
        source: ManifestError,
    },

    /// An inventory query matched only session-only modules and no session
    /// import path was available.
    #[error(
        "module '{name}' can only be imported through an interactive session, \
         and no session is available"
    )]
    SessionOnly { name: String },

    /// A network or session failure from an opaque remote handle.
    #[error("transport failure while importing '{module}': {source}")]
    Transport {
        module: String,
        #[source]
        source: TransportError,
    },

    /// The caller's cancellation signal fired mid-import.
    #[error("import of '{module}' was cancelled")]
    Cancelled { module: String },

    /// A hard filesystem failure, distinct from not-found fallthrough.
    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Map a manifest-layer error into the engine taxonomy: malformed
    /// version text keeps its own category, everything else is a manifest
    /// parse failure for the named module.
    #[must_use]
    pub fn from_manifest(name: impl Into<String>, source: ManifestError) -> Self {
        match source {
            ManifestError::BadVersion { text, .. } => Self::MalformedVersion { text },
            other => Self::ManifestParse {
                name: name.into(),
                source: other,
            },
        }
    }

    /// Stable category name for reporting.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::NoMatchingVersion { .. } => "VersionMismatch",
            Self::MalformedVersion { .. } => "MalformedVersion",
            Self::InvalidSpecification { .. } => "MalformedInput",
            Self::NothingToImport { .. } => "NothingToImport",
            Self::UnsupportedAdapter { .. } => "UnsupportedAdapter",
            Self::ManifestParse { .. } => "ManifestParse",
            Self::SessionOnly { .. } => "SessionOnly",
            Self::Transport { .. } => "TransportFailure",
            Self::Cancelled { .. } => "Cancelled",
            Self::Io { .. } => "Io",
        }
    }
}

/// A single item's failure within a batch operation.
///
/// Batches never abort sibling processing: each failed item is reported
/// individually, wrapped with the identifier it was requested under.
#[derive(Debug)]
pub struct ImportFailure {
    /// The name, pattern, or path the caller asked for.
    pub identifier: String,
    /// What went wrong for this item.
    pub error: ImportError,
}

/// Non-fatal conditions surfaced alongside a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportWarning {
    /// A mixed-mode module imported only its recognized capabilities.
    #[error("module '{module}' was partially imported: {detail}")]
    PartialCapability { module: String, detail: String },
}
