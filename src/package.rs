//! Linked package resolution
//!
//! A package is the producing side of a link: a local directory whose live
//! contents should appear inside the consuming project as if installed.

use crate::error::{PkglinkError, PkglinkResult};
use crate::manifest::{self, ManifestFile, MANIFEST_FILE};
use std::path::{Path, PathBuf};

/// Longest name npm accepts
const MAX_NAME_LEN: usize = 214;

/// A local package selected for linking
///
/// Resolved once at startup from a user-supplied path and immutable for the
/// rest of the run.
#[derive(Debug, Clone)]
pub struct Package {
    /// Declared, validated package name (possibly scoped)
    pub name: String,

    /// Package root directory, canonicalized
    pub root: PathBuf,

    /// Accessor for the package manifest
    pub manifest: ManifestFile,
}

impl Package {
    /// Resolve a package from a directory path
    pub fn resolve(path: &Path) -> PkglinkResult<Self> {
        let root = std::fs::canonicalize(path)
            .map_err(|_| PkglinkError::NotAPackage(path.to_path_buf()))?;
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(PkglinkError::NotAPackage(path.to_path_buf()));
        }

        let manifest = ManifestFile::open(&manifest_path)?;
        let value = manifest.get()?;
        let name = manifest::package_name(&value).unwrap_or_default();
        if !is_valid_name(name) {
            return Err(PkglinkError::InvalidPackageName(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            root,
            manifest,
        })
    }

    /// Path to the manifest file inside this package
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

/// Check a name against npm naming rules: lowercase, URL-safe punctuation,
/// optional scope prefix, length-limited, no leading `.` or `_`.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    match name.strip_prefix('@') {
        Some(rest) => match rest.split_once('/') {
            Some((scope, bare)) => is_valid_segment(scope) && is_valid_segment(bare),
            None => false,
        },
        None => is_valid_segment(name),
    }
}

fn is_valid_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.starts_with('.') || segment.starts_with('_') {
        return false;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package_dir(temp: &TempDir, name: &str) -> PathBuf {
        let dir = temp.path().join("pkg");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(MANIFEST_FILE),
            format!(r#"{{"name": "{name}", "version": "0.1.0"}}"#),
        )
        .unwrap();
        dir
    }

    #[test]
    fn resolves_valid_package() {
        let temp = TempDir::new().unwrap();
        let dir = package_dir(&temp, "@scope/widget");

        let package = Package::resolve(&dir).unwrap();
        assert_eq!(package.name, "@scope/widget");
        assert!(package.root.is_absolute());
    }

    #[test]
    fn fails_without_manifest() {
        let temp = TempDir::new().unwrap();
        let result = Package::resolve(temp.path());
        assert!(matches!(result, Err(PkglinkError::NotAPackage(_))));
    }

    #[test]
    fn fails_on_missing_directory() {
        let temp = TempDir::new().unwrap();
        let result = Package::resolve(&temp.path().join("nope"));
        assert!(matches!(result, Err(PkglinkError::NotAPackage(_))));
    }

    #[test]
    fn rejects_illegal_names() {
        let temp = TempDir::new().unwrap();
        for name in ["MyPackage", "has space", "_private", ".hidden", "@scope"] {
            let dir = package_dir(&temp, name);
            assert!(
                matches!(
                    Package::resolve(&dir),
                    Err(PkglinkError::InvalidPackageName(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn name_rules() {
        assert!(is_valid_name("left-pad"));
        assert!(is_valid_name("@scope/pkg.name_x"));
        assert!(is_valid_name("a"));

        assert!(!is_valid_name(""));
        assert!(!is_valid_name("UPPER"));
        assert!(!is_valid_name("with space"));
        assert!(!is_valid_name("@/empty-scope"));
        assert!(!is_valid_name("@scope/_bare"));
        assert!(!is_valid_name(&"x".repeat(215)));
    }
}
