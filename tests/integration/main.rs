//! Integration tests for pkglink

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn pkglink() -> Command {
        cargo_bin_cmd!("pkglink")
    }

    /// A minimal yarn project with the given lock-file contents
    fn project(temp: &TempDir, lock_contents: &str) -> std::path::PathBuf {
        let dir = temp.path().join("app");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            "{\n  \"name\": \"app\",\n  \"dependencies\": { \"widget\": \"^1.0.0\" }\n}\n",
        )
        .unwrap();
        std::fs::write(dir.join("yarn.lock"), lock_contents).unwrap();
        dir
    }

    fn package(temp: &TempDir, name: &str) -> std::path::PathBuf {
        let dir = temp.path().join("widget");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "{name}", "version": "1.0.0"}}"#),
        )
        .unwrap();
        dir
    }

    fn manifest_bytes(project_dir: &Path) -> Vec<u8> {
        std::fs::read(project_dir.join("package.json")).unwrap()
    }

    #[test]
    fn help_displays() {
        pkglink()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("link local packages"));
    }

    #[test]
    fn version_displays() {
        pkglink()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkglink"));
    }

    #[test]
    fn status_outside_project_fails() {
        let temp = TempDir::new().unwrap();
        pkglink()
            .arg("status")
            .current_dir(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No package.json found"));
    }

    #[test]
    fn status_with_nothing_linked() {
        let temp = TempDir::new().unwrap();
        let dir = project(&temp, "widget@^1.0.0:\n");
        pkglink()
            .arg("status")
            .current_dir(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("No packages are currently linked"));
    }

    #[test]
    fn link_rejects_non_package_path() {
        let temp = TempDir::new().unwrap();
        let dir = project(&temp, "widget@^1.0.0:\n");
        pkglink()
            .args(["link", "../not-there"])
            .current_dir(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("is not a package"));
    }

    #[test]
    fn link_rejects_invalid_package_name() {
        let temp = TempDir::new().unwrap();
        let dir = project(&temp, "widget@^1.0.0:\n");
        let bad = package(&temp, "Widget Name");
        pkglink()
            .arg(bad.to_str().unwrap())
            .current_dir(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("is not a valid package name"));
    }

    #[test]
    fn link_requires_a_supported_package_manager() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("app");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), r#"{"name": "app"}"#).unwrap();
        let widget = package(&temp, "widget");

        pkglink()
            .arg(widget.to_str().unwrap())
            .current_dir(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No supported package manager"));
    }

    // A linked package that is not in the lock file must fail fast, with
    // exit code 1 and without ever touching the project manifest.
    #[test]
    fn link_fails_when_package_is_not_a_dependency() {
        let temp = TempDir::new().unwrap();
        let dir = project(&temp, "something-else@^2.0.0:\n");
        let widget = package(&temp, "widget");
        let before = manifest_bytes(&dir);

        pkglink()
            .arg(widget.to_str().unwrap())
            .current_dir(&dir)
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "widget is not a dependency of this project",
            ))
            .stderr(predicate::str::contains("yarn install"));

        assert_eq!(manifest_bytes(&dir), before);
    }

    #[test]
    fn bare_invocation_without_config_explains_itself() {
        let temp = TempDir::new().unwrap();
        let dir = project(&temp, "widget@^1.0.0:\n");
        pkglink()
            .current_dir(&dir)
            .env("XDG_CONFIG_HOME", temp.path().join("empty-config"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("No package roots configured"));
    }

    #[test]
    fn config_show_runs() {
        let temp = TempDir::new().unwrap();
        pkglink()
            .args(["config", "show"])
            .env("XDG_CONFIG_HOME", temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_add_and_remove_roundtrip() {
        let temp = TempDir::new().unwrap();
        let packages_root = temp.path().join("packages");
        std::fs::create_dir_all(&packages_root).unwrap();
        let config_home = temp.path().join("config");

        pkglink()
            .args(["config", "add", packages_root.to_str().unwrap()])
            .env("XDG_CONFIG_HOME", &config_home)
            .assert()
            .success();

        pkglink()
            .args(["config", "show"])
            .env("XDG_CONFIG_HOME", &config_home)
            .assert()
            .success()
            .stdout(predicate::str::contains("packages"));

        pkglink()
            .args(["config", "remove", packages_root.to_str().unwrap()])
            .env("XDG_CONFIG_HOME", &config_home)
            .assert()
            .success();
    }
}
