//! Error types for wharf-core.

use miette::Diagnostic;
use thiserror::Error;
use wharf_config::ConfigError;
use wharf_uplink::UplinkError;

/// Core error type for registry storage operations.
///
/// Callers that speak HTTP map variants through [`CoreError::status`]:
/// confirmed absence is 404, duplicate creation 409, an unverifiable uplink
/// during a publish check 503, and local storage malfunction 500.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Package '{name}' not found")]
    #[diagnostic(
        code(wharf::package_not_found),
        help("The package is absent locally and no uplink confirmed it")
    )]
    PackageNotFound {
        name: String,
        /// Rendered per-uplink failures from the sync pass that produced
        /// this verdict, so 404 responses can carry diagnostics.
        uplink_failures: Vec<String>,
    },

    #[error("Tarball '{filename}' not found for package '{name}'")]
    #[diagnostic(code(wharf::tarball_not_found))]
    TarballNotFound { name: String, filename: String },

    #[error("Package '{0}' already exists")]
    #[diagnostic(
        code(wharf::package_exists),
        help("The name is taken locally or on an upstream registry")
    )]
    PackageExists(String),

    #[error("Uplink '{0}' could not be reached to verify the package name")]
    #[diagnostic(
        code(wharf::uplink_offline),
        help("Publishing is refused while an uplink cannot be verified; retry later")
    )]
    UplinkOffline(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Uplink(#[from] UplinkError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(wharf::json))]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(wharf::error))]
    Custom(String),
}

impl CoreError {
    /// Shorthand for a not-found verdict without uplink diagnostics.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::PackageNotFound {
            name: name.into(),
            uplink_failures: Vec::new(),
        }
    }

    /// True for any confirmed-absent verdict.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound { .. } | Self::TarballNotFound { .. }
        )
    }

    /// HTTP-style status semantics for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::PackageNotFound { .. } | Self::TarballNotFound { .. } => 404,
            Self::PackageExists(_) => 409,
            Self::UplinkOffline(_) => 503,
            Self::Uplink(err) => err.status().unwrap_or(503),
            _ => 500,
        }
    }
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| CoreError::IoError {
            action: context(),
            source: err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CoreError::not_found("pkg").status(), 404);
        assert_eq!(
            CoreError::TarballNotFound {
                name: "pkg".to_string(),
                filename: "pkg-1.0.0.tgz".to_string(),
            }
            .status(),
            404
        );
        assert_eq!(CoreError::PackageExists("pkg".to_string()).status(), 409);
        assert_eq!(CoreError::UplinkOffline("npmjs".to_string()).status(), 503);
        assert_eq!(CoreError::Custom("boom".to_string()).status(), 500);
    }

    #[test]
    fn test_uplink_status_passthrough() {
        let err = CoreError::Uplink(UplinkError::HttpStatus {
            status: 404,
            url: "https://registry.example/pkg".to_string(),
        });
        assert_eq!(err.status(), 404);

        let err = CoreError::Uplink(UplinkError::MalformedResponse("bad".to_string()));
        assert_eq!(err.status(), 503);
    }

    #[test]
    fn test_is_not_found() {
        assert!(CoreError::not_found("pkg").is_not_found());
        assert!(!CoreError::PackageExists("pkg".to_string()).is_not_found());
    }
}
