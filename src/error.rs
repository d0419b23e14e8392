//! Error types for pkglink
//!
//! All modules use `PkglinkResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkglink operations
pub type PkglinkResult<T> = Result<T, PkglinkError>;

/// All errors that can occur in pkglink
///
/// Precondition errors (invalid project, invalid package, unsupported
/// package manager, missing dependency declaration) are fatal and abort
/// the run with exit code 1. Installer failures and cancellations are
/// *not* errors; they are [`InstallOutcome`](crate::linker::InstallOutcome)
/// values and the process keeps running.
#[derive(Error, Debug)]
pub enum PkglinkError {
    // Resolution errors
    #[error("No package.json found above {0}")]
    InvalidProject(PathBuf),

    #[error("{0} is not a package")]
    NotAPackage(PathBuf),

    #[error("{0} is not a valid package name")]
    InvalidPackageName(String),

    #[error("No supported package manager detected in {0}")]
    UnsupportedPackageManager(PathBuf),

    #[error("{name} is not a dependency of this project")]
    MissingDependency {
        name: String,
        install_command: &'static str,
    },

    // Manifest errors
    #[error("Failed to parse {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to restore {path} to its original content")]
    ManifestRevert {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("No package roots configured")]
    NoPackagesConfigured,

    #[error("No linkable packages found under the configured roots")]
    NoPackagesFound,

    #[error("Interactive package selection requires a terminal")]
    SelectionUnavailable,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File watcher error: {context}")]
    Watch {
        context: String,
        #[source]
        source: notify::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PkglinkError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a watcher error with context
    pub fn watch(context: impl Into<String>, source: notify::Error) -> Self {
        Self::Watch {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidProject(_) => {
                Some("Run pkglink inside a project that has a package.json".into())
            }
            Self::UnsupportedPackageManager(_) => {
                Some("pkglink needs a yarn.lock or package-lock.json next to package.json".into())
            }
            Self::MissingDependency {
                install_command, ..
            } => Some(format!(
                "Add the package as a dependency and run: {install_command}"
            )),
            Self::NoPackagesConfigured => Some("Run: pkglink config add <directory>".into()),
            Self::NoPackagesFound => {
                Some("Check the configured roots with: pkglink config show".into())
            }
            Self::SelectionUnavailable => {
                Some("Pass package directories explicitly: pkglink <path>...".into())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PkglinkError::InvalidPackageName("Bad Name".to_string());
        assert!(err.to_string().contains("Bad Name"));
    }

    #[test]
    fn error_hint() {
        let err = PkglinkError::MissingDependency {
            name: "left-pad".to_string(),
            install_command: "yarn install",
        };
        assert_eq!(
            err.hint().as_deref(),
            Some("Add the package as a dependency and run: yarn install")
        );
    }

    #[test]
    fn io_constructor_keeps_context() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PkglinkError::io("reading lock file", source);
        assert!(err.to_string().contains("reading lock file"));
    }
}
