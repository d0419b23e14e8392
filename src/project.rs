//! Project resolution
//!
//! A project is the consuming side of a link: the directory whose
//! node_modules receives the linked packages. Resolution walks upward from
//! the working directory to the nearest package.json, with a single-level
//! escalation to a workspace root when one encloses it.

use crate::error::{PkglinkError, PkglinkResult};
use crate::manifest::{self, ManifestFile, MANIFEST_FILE};
use std::path::{Path, PathBuf};

/// Directory a package manager materializes dependencies into
pub const DEPENDENCY_DIR: &str = "node_modules";

/// The consuming project
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,

    /// Accessor for the project manifest
    pub manifest: ManifestFile,

    /// Private cache directory for this tool, inside node_modules
    pub cache_dir: PathBuf,
}

impl Project {
    /// Resolve the project enclosing `cwd`
    ///
    /// The nearest manifest wins, unless it declares no workspaces and a
    /// manifest found from the parent directory does; then the workspace
    /// root becomes the project. The escalation happens once, it is not an
    /// unbounded walk.
    pub fn resolve(cwd: &Path) -> PkglinkResult<Self> {
        let manifest_path =
            find_up(cwd).ok_or_else(|| PkglinkError::InvalidProject(cwd.to_path_buf()))?;
        let project = Self::at(&manifest_path)?;
        if manifest::declares_workspaces(&project.manifest.get()?) {
            return Ok(project);
        }

        let Some(parent) = cwd.parent() else {
            return Ok(project);
        };
        let Some(parent_manifest_path) = find_up(parent) else {
            return Ok(project);
        };
        let parent_project = Self::at(&parent_manifest_path)?;
        if manifest::declares_workspaces(&parent_project.manifest.get()?) {
            return Ok(parent_project);
        }
        Ok(project)
    }

    /// Where a linked package appears inside this project's dependency tree
    pub fn module_dir(&self, package_name: &str) -> PathBuf {
        self.root.join(DEPENDENCY_DIR).join(package_name)
    }

    /// Where the cache copy of a linked package lives
    pub fn cache_copy_dir(&self, package_name: &str) -> PathBuf {
        self.cache_dir.join(package_name)
    }

    fn at(manifest_path: &Path) -> PkglinkResult<Self> {
        let root = manifest_path
            .parent()
            .ok_or_else(|| PkglinkError::InvalidProject(manifest_path.to_path_buf()))?
            .to_path_buf();
        let cache_dir = root.join(DEPENDENCY_DIR).join(".cache").join("pkglink");
        Ok(Self {
            root,
            manifest: ManifestFile::open(manifest_path)?,
            cache_dir,
        })
    }
}

fn find_up(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let candidate = dir.join(MANIFEST_FILE);
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn resolves_nearest_manifest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("app");
        write_manifest(&root, r#"{"name": "app"}"#);
        let nested = root.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::resolve(&nested).unwrap();
        assert_eq!(project.root, root);
        assert_eq!(
            project.cache_dir,
            root.join("node_modules/.cache/pkglink")
        );
    }

    #[test]
    fn escalates_to_workspace_root() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("monorepo");
        write_manifest(&workspace, r#"{"name": "monorepo", "workspaces": ["apps/*"]}"#);
        let member = workspace.join("apps").join("web");
        write_manifest(&member, r#"{"name": "web"}"#);

        let project = Project::resolve(&member).unwrap();
        assert_eq!(project.root, workspace);
    }

    #[test]
    fn keeps_nearest_when_parent_has_no_workspaces() {
        let temp = TempDir::new().unwrap();
        let outer = temp.path().join("outer");
        write_manifest(&outer, r#"{"name": "outer"}"#);
        let inner = outer.join("inner");
        write_manifest(&inner, r#"{"name": "inner"}"#);

        let project = Project::resolve(&inner).unwrap();
        assert_eq!(project.root, inner);
    }

    #[test]
    fn fails_without_manifest() {
        let temp = TempDir::new().unwrap();
        let result = Project::resolve(temp.path());
        assert!(matches!(result, Err(PkglinkError::InvalidProject(_))));
    }

    #[test]
    fn module_dir_nests_scoped_names() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name": "app"}"#);
        let project = Project::resolve(temp.path()).unwrap();
        assert_eq!(
            project.module_dir("@scope/foo"),
            project.root.join("node_modules").join("@scope/foo")
        );
    }
}
