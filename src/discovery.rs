//! Candidate package discovery under the configured roots

use crate::manifest::MANIFEST_FILE;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A package offered for selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub root: PathBuf,
}

/// Scan every root's immediate subdirectories for packages, falling back to
/// the root itself when none of them is one. Results are sorted by name.
pub fn find_packages(roots: &[PathBuf]) -> Vec<Candidate> {
    let mut found = Vec::new();
    for root in roots {
        let mut in_root = Vec::new();
        if let Ok(entries) = std::fs::read_dir(root) {
            for entry in entries.flatten() {
                if let Some(candidate) = candidate_at(&entry.path()) {
                    in_root.push(candidate);
                }
            }
        }
        if in_root.is_empty() {
            if let Some(candidate) = candidate_at(root) {
                in_root.push(candidate);
            }
        }
        found.extend(in_root);
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

fn candidate_at(dir: &Path) -> Option<Candidate> {
    let bytes = std::fs::read(dir.join(MANIFEST_FILE)).ok()?;
    let manifest: Value = serde_json::from_slice(&bytes).ok()?;
    let name = crate::manifest::package_name(&manifest)?;
    Some(Candidate {
        name: name.to_string(),
        root: dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_package(parent: &Path, dir: &str, name: &str) {
        let path = parent.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(
            path.join(MANIFEST_FILE),
            format!(r#"{{"name": "{name}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn finds_subdirectory_packages_sorted() {
        let temp = TempDir::new().unwrap();
        add_package(temp.path(), "zeta", "zeta-lib");
        add_package(temp.path(), "alpha", "alpha-lib");
        std::fs::create_dir_all(temp.path().join("not-a-package")).unwrap();

        let found = find_packages(&[temp.path().to_path_buf()]);
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["alpha-lib", "zeta-lib"]);
    }

    #[test]
    fn falls_back_to_root_itself() {
        let temp = TempDir::new().unwrap();
        add_package(temp.path(), ".", "standalone");

        let found = find_packages(&[temp.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "standalone");
    }

    #[test]
    fn missing_root_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let found = find_packages(&[temp.path().join("gone")]);
        assert!(found.is_empty());
    }
}
