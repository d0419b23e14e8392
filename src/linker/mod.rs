//! Installation-and-sync orchestration
//!
//! The lifecycle runs as a loop over one channel of manifest-change events:
//! install the pinned packages, then either hand off to the synchronizer
//! (success) or keep waiting (installer error), until a linked package's
//! manifest changes and the cycle restarts. A change arriving while an
//! installation is in flight cancels it; the remainder of the burst is
//! drained before the fresh attempt starts, so at most one installation is
//! ever active and a burst of edits costs one cancellation and one reinstall.

pub mod install;
pub mod syncer;

pub use install::{InstallOutcome, Installation};
pub use syncer::Syncer;

use crate::cleanup::CleanupRegistry;
use crate::error::{PkglinkError, PkglinkResult};
use crate::manager::PackageManager;
use crate::manifest::MANIFEST_FILE;
use crate::package::Package;
use crate::project::Project;
use crate::ui::{TaskSpinner, UiContext};
use console::Term;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The install-and-sync orchestrator
pub struct Linker {
    project: Project,
    manager: PackageManager,
    packages: Vec<Package>,
    cleanups: CleanupRegistry,
    ctx: UiContext,
}

impl Linker {
    /// Create an orchestrator for a resolved project and package set
    pub fn new(
        project: Project,
        packages: Vec<Package>,
        cleanups: CleanupRegistry,
        ctx: UiContext,
    ) -> PkglinkResult<Self> {
        let manager = PackageManager::detect(&project.root)?;
        Ok(Self {
            project,
            manager,
            packages,
            cleanups,
            ctx,
        })
    }

    /// Run until interrupted: install, sync, reinstall on manifest changes
    pub async fn run(mut self) -> PkglinkResult<()> {
        self.ensure_declared_dependencies()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _watcher = self.watch_package_manifests(tx)?;
        self.run_loop(rx).await
    }

    /// Every linked package must already be declared as a dependency of the
    /// project; a missing one is a configuration mistake, not a retryable
    /// state
    fn ensure_declared_dependencies(&self) -> PkglinkResult<()> {
        let mut spinner = TaskSpinner::new(&self.ctx);
        spinner.start("Checking project dependencies...");

        let lock_file = self.manager.read_lock_file(&self.project)?;
        for package in &self.packages {
            if !lock_file.contains(&package.name) {
                spinner.stop_error(&format!("{} is not a project dependency", package.name));
                return Err(PkglinkError::MissingDependency {
                    name: package.name.clone(),
                    install_command: self.manager.install_command(),
                });
            }
        }

        spinner.stop("Project dependencies checked");
        Ok(())
    }

    /// Watch each linked package's own manifest; any change event re-enters
    /// the install cycle
    fn watch_package_manifests(
        &self,
        tx: mpsc::UnboundedSender<()>,
    ) -> PkglinkResult<RecommendedWatcher> {
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) if is_manifest_change(&event) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Manifest watch error: {e}"),
            })
            .map_err(|e| PkglinkError::watch("watching package manifests", e))?;

        // Watching the package directory instead of the file itself keeps
        // the watch alive across editors that replace the file on save.
        for package in &self.packages {
            watcher
                .watch(&package.root, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    PkglinkError::watch(format!("watching {}", package.root.display()), e)
                })?;
        }
        Ok(watcher)
    }

    async fn run_loop(&mut self, mut changes: mpsc::UnboundedReceiver<()>) -> PkglinkResult<()> {
        let mut syncer = Syncer::new(&self.project, self.manager, &self.packages, &self.ctx);
        let mut first_run = true;

        loop {
            syncer.stop();
            if !first_run && self.ctx.use_fancy_output() {
                Term::stdout().clear_screen().ok();
            }
            first_run = false;

            let mut installation = Installation::start(
                &self.project,
                self.manager,
                &self.packages,
                &self.cleanups,
                &self.ctx,
            );

            enum Next {
                Settled(PkglinkResult<InstallOutcome>),
                Changed,
                Closed,
            }
            let next = tokio::select! {
                outcome = installation.wait() => Next::Settled(outcome),
                changed = changes.recv() => match changed {
                    Some(()) => Next::Changed,
                    None => Next::Closed,
                },
            };

            match next {
                Next::Settled(outcome) => {
                    if outcome? == InstallOutcome::Success {
                        syncer.start()?;
                    }
                    // On an installer error the loop stays up and retries on
                    // the next manifest change.
                }
                Next::Changed => {
                    debug!("Manifest changed mid-install, restarting");
                    installation.cancel().await;
                    drain(&mut changes);
                    continue;
                }
                Next::Closed => {
                    installation.cancel().await;
                    syncer.stop();
                    return Ok(());
                }
            }

            match changes.recv().await {
                Some(()) => drain(&mut changes),
                None => {
                    syncer.stop();
                    return Ok(());
                }
            }
        }
    }
}

/// Collapse whatever is left of an edit burst into the single restart that
/// is already underway
fn drain(rx: &mut mpsc::UnboundedReceiver<()>) {
    while rx.try_recv().is_ok() {}
}

fn is_manifest_change(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().map(|n| n == MANIFEST_FILE).unwrap_or(false))
}
