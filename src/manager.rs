//! Package manager detection and manager-specific operations
//!
//! The two supported managers differ in how a dependency is pinned to a
//! local path: yarn honors a `resolutions` table as-is, while npm treats a
//! name present in both `dependencies` and `overrides` as ambiguous, so the
//! direct declarations have to be stripped before the override is added.

use crate::error::{PkglinkError, PkglinkResult};
use crate::project::{Project, DEPENDENCY_DIR};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Lock file written by yarn
pub const YARN_LOCK: &str = "yarn.lock";

/// Lock file written by npm
pub const NPM_LOCK: &str = "package-lock.json";

/// Mapping from package name to the cache path it must resolve to
pub type ResolutionMap = Map<String, Value>;

/// The package manager a project uses, detected from its lock file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Yarn,
    Npm,
}

impl PackageManager {
    /// Detect the manager from lock-file presence. Yarn wins when both
    /// lock files exist. No lock file is fatal; there is no fallback.
    pub fn detect(project_root: &std::path::Path) -> PkglinkResult<Self> {
        if project_root.join(YARN_LOCK).is_file() {
            Ok(Self::Yarn)
        } else if project_root.join(NPM_LOCK).is_file() {
            Ok(Self::Npm)
        } else {
            Err(PkglinkError::UnsupportedPackageManager(
                project_root.to_path_buf(),
            ))
        }
    }

    /// Compute the project manifest with the linked packages pinned to
    /// their cache copies
    pub fn updated_manifest(&self, original: Value, resolutions: &ResolutionMap) -> Value {
        let mut manifest = original;
        match self {
            Self::Yarn => {
                merge_section(&mut manifest, "resolutions", resolutions);
            }
            Self::Npm => {
                strip_entries(&mut manifest, "dependencies", resolutions);
                strip_entries(&mut manifest, "devDependencies", resolutions);
                merge_section(&mut manifest, "overrides", resolutions);
            }
        }
        manifest
    }

    /// Build the forced, lockfile-exact, non-interactive install command
    ///
    /// The child inherits nothing on stdin and keeps stdout quiet; stderr is
    /// piped so a failing install can be reported.
    pub fn installer(&self, project: &Project) -> Command {
        let mut cmd = match self {
            Self::Yarn => {
                let mut cmd = Command::new("yarn");
                cmd.args(["install", "--force", "--pure-lockfile", "--non-interactive"]);
                cmd
            }
            Self::Npm => {
                let mut cmd = Command::new("npm");
                cmd.args(["install", "--force", "--silent"]);
                cmd
            }
        };
        cmd.current_dir(&project.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Path of the project's lock file
    pub fn lock_file_path(&self, project: &Project) -> PathBuf {
        match self {
            Self::Yarn => project.root.join(YARN_LOCK),
            Self::Npm => project.root.join(NPM_LOCK),
        }
    }

    /// Raw lock-file text
    ///
    /// Used only for a textual inclusion check of package names. That is a
    /// deliberately cheap approximation of "is declared as a dependency"
    /// and can match substrings; see the tests.
    pub fn read_lock_file(&self, project: &Project) -> PkglinkResult<String> {
        let path = self.lock_file_path(project);
        std::fs::read_to_string(&path)
            .map_err(|e| PkglinkError::io(format!("reading {}", path.display()), e))
    }

    /// Human-facing install command, for remediation messages
    pub fn install_command(&self) -> &'static str {
        match self {
            Self::Yarn => "yarn install",
            Self::Npm => "npm install",
        }
    }

    /// File whose mtime is touched after each synced change, for build
    /// tools that watch the installed tree
    pub fn rebuild_trigger(&self, project: &Project) -> PathBuf {
        match self {
            // Build tools watching node_modules commonly key off the
            // integrity marker yarn rewrites on every install.
            Self::Yarn => project.root.join(DEPENDENCY_DIR).join(".yarn-integrity"),
            Self::Npm => project.root.join(NPM_LOCK),
        }
    }
}

fn merge_section(manifest: &mut Value, section: &str, entries: &ResolutionMap) {
    let Some(root) = manifest.as_object_mut() else {
        return;
    };
    let slot = root
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Some(map) = slot.as_object_mut() {
        for (name, path) in entries {
            map.insert(name.clone(), path.clone());
        }
    }
}

fn strip_entries(manifest: &mut Value, section: &str, entries: &ResolutionMap) {
    if let Some(map) = manifest
        .get_mut(section)
        .and_then(Value::as_object_mut)
    {
        map.retain(|name, _| !entries.contains_key(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn project_at(temp: &TempDir) -> Project {
        std::fs::write(temp.path().join("package.json"), r#"{"name": "app"}"#).unwrap();
        Project::resolve(temp.path()).unwrap()
    }

    fn resolutions(entries: &[(&str, &str)]) -> ResolutionMap {
        entries
            .iter()
            .map(|(name, path)| (name.to_string(), Value::String(path.to_string())))
            .collect()
    }

    #[test]
    fn detects_yarn_first() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(YARN_LOCK), "").unwrap();
        std::fs::write(temp.path().join(NPM_LOCK), "{}").unwrap();
        assert_eq!(
            PackageManager::detect(temp.path()).unwrap(),
            PackageManager::Yarn
        );
    }

    #[test]
    fn detects_npm() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(NPM_LOCK), "{}").unwrap();
        assert_eq!(
            PackageManager::detect(temp.path()).unwrap(),
            PackageManager::Npm
        );
    }

    #[test]
    fn detection_fails_without_lock_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            PackageManager::detect(temp.path()),
            Err(PkglinkError::UnsupportedPackageManager(_))
        ));
    }

    #[test]
    fn yarn_adds_resolutions_and_keeps_dependencies() {
        let original = json!({
            "name": "app",
            "dependencies": {"@scope/foo": "^1.0.0", "bar": "^2.0.0"},
            "devDependencies": {"@scope/foo": "^1.0.0"}
        });
        let updated = PackageManager::Yarn.updated_manifest(
            original,
            &resolutions(&[("@scope/foo", "/cache/@scope/foo")]),
        );

        assert_eq!(
            updated["resolutions"]["@scope/foo"],
            json!("/cache/@scope/foo")
        );
        assert_eq!(updated["dependencies"]["@scope/foo"], json!("^1.0.0"));
        assert_eq!(updated["devDependencies"]["@scope/foo"], json!("^1.0.0"));
    }

    #[test]
    fn yarn_merges_into_existing_resolutions() {
        let original = json!({"resolutions": {"other": "1.2.3"}});
        let updated = PackageManager::Yarn
            .updated_manifest(original, &resolutions(&[("foo", "/cache/foo")]));

        assert_eq!(updated["resolutions"]["other"], json!("1.2.3"));
        assert_eq!(updated["resolutions"]["foo"], json!("/cache/foo"));
    }

    #[test]
    fn npm_strips_dependencies_and_adds_overrides() {
        let original = json!({
            "name": "app",
            "dependencies": {"@scope/foo": "^1.0.0", "bar": "^2.0.0"},
            "devDependencies": {"@scope/foo": "^1.0.0", "baz": "^3.0.0"}
        });
        let updated = PackageManager::Npm.updated_manifest(
            original,
            &resolutions(&[("@scope/foo", "/cache/@scope/foo")]),
        );

        assert!(updated["dependencies"].get("@scope/foo").is_none());
        assert!(updated["devDependencies"].get("@scope/foo").is_none());
        assert_eq!(updated["dependencies"]["bar"], json!("^2.0.0"));
        assert_eq!(updated["devDependencies"]["baz"], json!("^3.0.0"));
        assert_eq!(
            updated["overrides"]["@scope/foo"],
            json!("/cache/@scope/foo")
        );
    }

    #[test]
    fn install_command_names_the_manager() {
        assert_eq!(PackageManager::Yarn.install_command(), "yarn install");
        assert_eq!(PackageManager::Npm.install_command(), "npm install");
    }

    #[test]
    fn rebuild_trigger_paths() {
        let temp = TempDir::new().unwrap();
        let project = project_at(&temp);
        assert_eq!(
            PackageManager::Yarn.rebuild_trigger(&project),
            project.root.join("node_modules/.yarn-integrity")
        );
        assert_eq!(
            PackageManager::Npm.rebuild_trigger(&project),
            project.root.join(NPM_LOCK)
        );
    }

    // The declared-dependency check is textual inclusion on the raw lock
    // file. A lock entry for "foobar" therefore also matches a check for
    // "foo". This is a known approximation carried over from the original
    // behavior, not something callers should rely on being exact.
    #[test]
    fn lock_file_check_is_textual() {
        let temp = TempDir::new().unwrap();
        let project = project_at(&temp);
        std::fs::write(
            temp.path().join(YARN_LOCK),
            "foobar@^1.0.0:\n  version \"1.0.0\"\n",
        )
        .unwrap();

        let lock = PackageManager::Yarn.read_lock_file(&project).unwrap();
        assert!(lock.contains("foobar"));
        assert!(lock.contains("foo"), "substring false positive is expected");
        assert!(!lock.contains("quux"));
    }
}
