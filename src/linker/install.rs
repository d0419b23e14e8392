//! One pin-and-install attempt
//!
//! An [`Installation`] runs the whole attempt inside a driver task: register
//! the manifest rollback with the cleanup registry, refresh the cache copies,
//! write the override manifest, drive the installer child process, then
//! settle by unregistering and reverting. Early I/O failures classify as the
//! `Error` outcome rather than aborting the process; only a failed manifest
//! revert is fatal.

use crate::cleanup::CleanupRegistry;
use crate::error::{PkglinkError, PkglinkResult};
use crate::manager::{PackageManager, ResolutionMap};
use crate::manifest::ManifestFile;
use crate::package::Package;
use crate::project::Project;
use crate::ui::{self, InstallProgress, UiContext};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

/// Terminal result of one installation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Installer exited zero; the pinned packages are materialized
    Success,
    /// Cancellation was requested before the installer finished
    Canceled,
    /// Installer failed; the orchestrator stays up and retries later
    Error(String),
}

/// Handle to one in-flight installation attempt
///
/// `cancel()` is safe to call before or after natural completion, and
/// `wait()` after a cancellation resolves to `Canceled` instead of hanging.
pub struct Installation {
    handle: Option<JoinHandle<PkglinkResult<InstallOutcome>>>,
    cancel: Arc<Notify>,
}

impl Installation {
    /// Begin an attempt. The returned handle is the only way to observe it.
    pub fn start(
        project: &Project,
        manager: PackageManager,
        packages: &[Package],
        cleanups: &CleanupRegistry,
        ctx: &UiContext,
    ) -> Self {
        let cancel = Arc::new(Notify::new());
        let driver = Driver {
            manifest: project.manifest.clone(),
            cache_dir: project.cache_dir.clone(),
            installer: manager.installer(project),
            manager,
            packages: packages
                .iter()
                .map(|p| (p.name.clone(), p.root.clone()))
                .collect(),
            cleanups: cleanups.clone(),
            ctx: ctx.clone(),
        };
        let signal = cancel.clone();
        let handle = tokio::spawn(driver.run(signal));
        Self {
            handle: Some(handle),
            cancel,
        }
    }

    /// Await the terminal outcome
    ///
    /// Fatal conditions (a manifest that could not be restored) surface as
    /// `Err`; everything else is an [`InstallOutcome`].
    pub async fn wait(&mut self) -> PkglinkResult<InstallOutcome> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(InstallOutcome::Canceled);
        };
        let joined = handle.await;
        self.handle = None;
        joined.unwrap_or_else(|e| {
            Err(PkglinkError::Internal(format!(
                "installation task failed: {e}"
            )))
        })
    }

    /// Request cancellation and wait for the attempt to settle
    ///
    /// The child receives a termination signal; its error is swallowed.
    pub async fn cancel(&mut self) {
        self.cancel.notify_one();
        if let Some(handle) = self.handle.as_mut() {
            let _ = handle.await;
            self.handle = None;
        }
    }
}

struct Driver {
    manifest: ManifestFile,
    cache_dir: PathBuf,
    manager: PackageManager,
    installer: tokio::process::Command,
    packages: Vec<(String, PathBuf)>,
    cleanups: CleanupRegistry,
    ctx: UiContext,
}

enum AttemptEnd {
    Exited(ExitStatus, Vec<u8>),
    Canceled,
    Failed(PkglinkError),
}

impl Driver {
    async fn run(mut self, cancel: Arc<Notify>) -> PkglinkResult<InstallOutcome> {
        let progress = InstallProgress::start(&self.ctx, "Installing transitive dependencies...");

        // An interrupt arriving anywhere inside the attempt must still
        // restore the manifest, so the rollback is registered first.
        let revert_path = self.manifest.path().to_path_buf();
        let revert_bytes = self.manifest.original_bytes().to_vec();
        let cleanup_id = self.cleanups.register(move || {
            if let Err(e) = std::fs::write(&revert_path, &revert_bytes) {
                error!("Failed to restore {}: {}", revert_path.display(), e);
            }
        });

        let end = self.attempt(&cancel).await;

        // Settle exactly once. The override's only purpose was to steer this
        // install, so the manifest goes back to its original bytes on every
        // path, success included. When unregister reports the callback gone,
        // the interrupt handler already restored the file.
        let reverted = if self.cleanups.unregister(cleanup_id) {
            self.manifest.revert()
        } else {
            Ok(())
        };
        if let Err(e) = reverted {
            progress.finish_error("Could not restore the project manifest");
            return Err(e);
        }

        Ok(match end {
            AttemptEnd::Exited(status, _) if status.success() => {
                progress.finish_ok("Transitive dependencies installed");
                InstallOutcome::Success
            }
            AttemptEnd::Exited(status, stderr) => {
                progress.finish_error("Installation failed with the following error:");
                let detail = String::from_utf8_lossy(&stderr);
                let detail = detail.trim();
                if !detail.is_empty() {
                    eprintln!("{detail}");
                }
                ui::step_warn(
                    &self.ctx,
                    "Will reinstall on the next change in a linked package's manifest",
                );
                InstallOutcome::Error(format!("installer exited with {status}"))
            }
            AttemptEnd::Canceled => {
                progress.finish_warn("Installation aborted due to change in package manifest");
                InstallOutcome::Canceled
            }
            AttemptEnd::Failed(e) => {
                progress.finish_error("Installation failed with the following error:");
                eprintln!("{e}");
                ui::step_warn(
                    &self.ctx,
                    "Will reinstall on the next change in a linked package's manifest",
                );
                InstallOutcome::Error(e.to_string())
            }
        })
    }

    async fn attempt(&mut self, cancel: &Notify) -> AttemptEnd {
        let resolutions = match self.refresh_cache().await {
            Ok(resolutions) => resolutions,
            Err(e) => return AttemptEnd::Failed(e),
        };

        let updated = match self.manifest.get() {
            Ok(original) => self.manager.updated_manifest(original, &resolutions),
            Err(e) => return AttemptEnd::Failed(e),
        };
        if let Err(e) = self.manifest.set(&updated) {
            return AttemptEnd::Failed(e);
        }

        debug!("Spawning {} installer", self.manager.install_command());
        let mut child = match self.installer.spawn() {
            Ok(child) => child,
            Err(e) => {
                return AttemptEnd::Failed(PkglinkError::io("spawning dependency installer", e))
            }
        };

        // Drain stderr concurrently so a chatty installer cannot fill the
        // pipe and stall while nobody is waiting on it.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stream) = stderr {
                let _ = stream.read_to_end(&mut buf).await;
            }
            buf
        });

        enum Raced {
            Exited(std::io::Result<ExitStatus>),
            Canceled,
        }
        let raced = tokio::select! {
            status = child.wait() => Raced::Exited(status),
            _ = cancel.notified() => Raced::Canceled,
        };

        match raced {
            Raced::Exited(Ok(status)) => {
                let stderr = stderr_task.await.unwrap_or_default();
                AttemptEnd::Exited(status, stderr)
            }
            Raced::Exited(Err(e)) => {
                AttemptEnd::Failed(PkglinkError::io("waiting for dependency installer", e))
            }
            Raced::Canceled => {
                if let Err(e) = child.kill().await {
                    debug!("Installer already gone on kill: {e}");
                }
                stderr_task.abort();
                AttemptEnd::Canceled
            }
        }
    }

    /// Delete and recreate the cache copy of every linked package, returning
    /// the name-to-cache-path resolution map
    async fn refresh_cache(&self) -> PkglinkResult<ResolutionMap> {
        let cache_dir = self.cache_dir.clone();
        let packages = self.packages.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = std::fs::remove_dir_all(&cache_dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(PkglinkError::io(
                        format!("clearing cache {}", cache_dir.display()),
                        e,
                    ));
                }
            }
            let mut resolutions = ResolutionMap::new();
            for (name, root) in &packages {
                let dest = cache_dir.join(name);
                copy_tree(root, &dest)?;
                resolutions.insert(name.clone(), Value::String(dest.display().to_string()));
            }
            Ok(resolutions)
        })
        .await
        .map_err(|e| PkglinkError::Internal(format!("cache copy task failed: {e}")))?
    }
}

/// Copy a package tree, skipping version-control and installed-dependency
/// subtrees
fn copy_tree(src: &Path, dest: &Path) -> PkglinkResult<()> {
    for entry in WalkDir::new(src).into_iter().filter_entry(keep_entry) {
        let entry = entry
            .map_err(|e| PkglinkError::io(format!("walking {}", src.display()), e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| PkglinkError::Internal("walked outside the package root".into()))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| PkglinkError::io(format!("creating {}", target.display()), e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| {
                PkglinkError::io(format!("copying into {}", target.display()), e)
            })?;
        }
    }
    Ok(())
}

fn keep_entry(entry: &DirEntry) -> bool {
    !(entry.file_type().is_dir()
        && matches!(entry.file_name().to_str(), Some(".git" | "node_modules")))
}
