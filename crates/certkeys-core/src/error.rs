use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type alias for certificate store operations
pub type Result<T> = std::result::Result<T, CertError>;

/// Errors that can occur while managing identities and certificates
#[derive(Error, Debug)]
pub enum CertError {
    /// An identity, bundle, or tool binary is absent
    #[error("not found: {resource}")]
    NotFound {
        /// Description of what was missing
        resource: String,
    },

    /// A create or dump target is already present
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// Description of the conflicting resource
        resource: String,
    },

    /// Certificate read attempted on an identity with no general names
    #[error("identity '{name}' has no general names to certify")]
    EmptyIdentity {
        /// Identity name
        name: String,
    },

    /// Forward DNS lookup failed
    #[error("cannot resolve '{name}': {reason}")]
    Resolution {
        /// Name that was looked up
        name: String,
        /// Resolver error message
        reason: String,
    },

    /// The external minting process failed or produced unreadable output
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// Fetching the minting tool failed
    #[error("tool download failed: {0}")]
    Download(String),

    /// The minting tool cannot be located or acquired
    #[error("minting tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Identity name is not usable as a file name
    #[error("invalid identity name: {0:?}")]
    InvalidName(String),

    /// Malformed configuration or identity file
    #[error("invalid configuration in {path}: {reason}")]
    Config {
        /// File that failed to parse
        path: String,
        /// Parser message
        reason: String,
    },

    /// PEM or X.509 material that cannot be parsed
    #[error("invalid certificate material: {0}")]
    Certificate(String),

    /// Any other filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl CertError {
    /// Map an I/O error on `path`, keeping missing/existing files distinguishable.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let resource = path.as_ref().display().to_string();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { resource },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { resource },
            _ => Self::Io {
                path: resource,
                source,
            },
        }
    }

    /// Shorthand for [`CertError::NotFound`]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Shorthand for [`CertError::AlreadyExists`]
    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
        }
    }

    /// Returns true if the error reports a missing resource
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error reports a conflicting resource
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
