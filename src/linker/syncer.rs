//! Live one-way mirror of linked package trees into node_modules
//!
//! One recursive watcher per linked package. Every relevant event becomes an
//! idempotent copy/remove task keyed by its own path; tasks may race and the
//! last writer wins on a given target. A single debounced trigger touches
//! the manager's rebuild file so downstream build watchers notice the
//! installed tree changed.

use crate::error::{PkglinkError, PkglinkResult};
use crate::manager::PackageManager;
use crate::package::Package;
use crate::project::Project;
use crate::state::{self, LinkedPackage};
use crate::ui::{self, UiContext};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Quiet window before the rebuild trigger is touched
const REBUILD_DEBOUNCE: Duration = Duration::from_millis(300);

/// Upper bound on mirror operations in flight at once
const MAX_CONCURRENT_MIRRORS: usize = 8;

/// What an event means for the mirrored tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MirrorAction {
    /// Copy the file, or ensure the directory, at the mirrored path
    Mirror,
    /// Remove the mirrored counterpart
    Remove,
}

struct SyncTarget {
    root: PathBuf,
    manifest_path: PathBuf,
    mirror_root: PathBuf,
}

/// The file synchronizer for one set of linked packages
pub struct Syncer {
    project: Project,
    targets: Arc<Vec<SyncTarget>>,
    linked: Vec<LinkedPackage>,
    watchers: Vec<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
    rebuild_tx: mpsc::UnboundedSender<()>,
    ctx: UiContext,
}

impl Syncer {
    /// Create a stopped synchronizer
    ///
    /// The debounce task is created here, once; it survives start/stop
    /// cycles so a reinstall does not reset a pending trigger.
    pub fn new(
        project: &Project,
        manager: PackageManager,
        packages: &[Package],
        ctx: &UiContext,
    ) -> Self {
        let targets = packages
            .iter()
            .map(|p| SyncTarget {
                root: p.root.clone(),
                manifest_path: p.manifest_path(),
                mirror_root: project.module_dir(&p.name),
            })
            .collect();
        let linked = packages.iter().map(LinkedPackage::from).collect();

        let (rebuild_tx, rebuild_rx) = mpsc::unbounded_channel();
        tokio::spawn(debounce_touch(rebuild_rx, manager.rebuild_trigger(project)));

        Self {
            project: project.clone(),
            targets: Arc::new(targets),
            linked,
            watchers: Vec::new(),
            worker: None,
            rebuild_tx,
            ctx: ctx.clone(),
        }
    }

    /// Whether watchers are currently active
    pub fn is_running(&self) -> bool {
        !self.watchers.is_empty()
    }

    /// Begin watching and mirroring. No-op when already running.
    pub fn start(&mut self) -> PkglinkResult<()> {
        if self.is_running() {
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel::<(usize, Event)>();
        for (index, target) in self.targets.iter().enumerate() {
            let events = tx.clone();
            let mut watcher =
                notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
                    match res {
                        // Access events carry nothing to mirror
                        Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
                        Ok(event) => {
                            let _ = events.send((index, event));
                        }
                        Err(e) => warn!("Watch error: {e}"),
                    }
                })
                .map_err(|e| {
                    PkglinkError::watch(format!("watching {}", target.root.display()), e)
                })?;
            watcher
                .watch(&target.root, RecursiveMode::Recursive)
                .map_err(|e| {
                    PkglinkError::watch(format!("watching {}", target.root.display()), e)
                })?;
            debug!("Watching {}", target.root.display());
            self.watchers.push(watcher);
        }
        drop(tx);

        self.worker = Some(tokio::spawn(mirror_events(
            rx,
            self.targets.clone(),
            self.rebuild_tx.clone(),
        )));

        state::record_linked(&self.project, &self.linked)?;
        ui::step_info(&self.ctx, "Keeping packages in sync...");
        ui::note(
            &self.ctx,
            "Make sure you are using the latest code!",
            "If a linked package needs a build step, keep its watch/build\n\
             command running alongside pkglink, or the mirrored code goes stale.",
        );
        Ok(())
    }

    /// Close every watcher and record that nothing is synced. Idempotent.
    pub fn stop(&mut self) {
        self.watchers.clear();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        if let Err(e) = state::record_linked(&self.project, &[]) {
            warn!("Could not update link state: {e}");
        }
    }
}

async fn mirror_events(
    mut rx: mpsc::UnboundedReceiver<(usize, Event)>,
    targets: Arc<Vec<SyncTarget>>,
    rebuild: mpsc::UnboundedSender<()>,
) {
    let limiter = Arc::new(Semaphore::new(MAX_CONCURRENT_MIRRORS));
    while let Some((index, event)) = rx.recv().await {
        let target = &targets[index];
        for path in &event.paths {
            if !concerns_target(target, path) {
                continue;
            }
            let action = match classify(&event.kind) {
                Ok(Some(action)) => action,
                Ok(None) => continue,
                Err(e) => {
                    error!("{e}; stopping the synchronizer");
                    return;
                }
            };
            let Ok(relative) = path.strip_prefix(&target.root) else {
                continue;
            };

            let source = path.clone();
            let dest = target.mirror_root.join(relative);
            let Ok(permit) = limiter.clone().acquire_owned().await else {
                return;
            };
            tokio::spawn(async move {
                if let Err(e) = apply(action, &source, &dest).await {
                    warn!("Sync of {} failed: {e}", source.display());
                }
                drop(permit);
            });
            let _ = rebuild.send(());
        }
    }
}

fn classify(kind: &EventKind) -> PkglinkResult<Option<MirrorAction>> {
    match kind {
        EventKind::Create(_) => Ok(Some(MirrorAction::Mirror)),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Ok(Some(MirrorAction::Remove)),
        EventKind::Modify(_) => Ok(Some(MirrorAction::Mirror)),
        EventKind::Remove(_) => Ok(Some(MirrorAction::Remove)),
        EventKind::Access(_) => Ok(None),
        EventKind::Any | EventKind::Other => Err(PkglinkError::Internal(
            "unexpected filesystem event kind".into(),
        )),
    }
}

/// Whether an event path should be mirrored for this target
///
/// The watched root itself, the package's own manifest (handled by the
/// orchestrator, never mirrored), and version-control or installed-dependency
/// subtrees are all skipped.
fn concerns_target(target: &SyncTarget, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(&target.root) else {
        return false;
    };
    if relative.as_os_str().is_empty() {
        return false;
    }
    if path == target.manifest_path {
        return false;
    }
    !relative
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some(".git" | "node_modules")))
}

async fn apply(action: MirrorAction, source: &Path, dest: &Path) -> PkglinkResult<()> {
    match action {
        MirrorAction::Mirror => match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_dir() => tokio::fs::create_dir_all(dest)
                .await
                .map_err(|e| PkglinkError::io(format!("creating {}", dest.display()), e)),
            Ok(_) => {
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| PkglinkError::io(format!("creating {}", parent.display()), e))?;
                }
                tokio::fs::copy(source, dest)
                    .await
                    .map(|_| ())
                    .map_err(|e| PkglinkError::io(format!("copying to {}", dest.display()), e))
            }
            // Gone again before we mirrored it; a remove event follows
            Err(_) => Ok(()),
        },
        MirrorAction::Remove => match tokio::fs::remove_file(dest).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(_) => match tokio::fs::remove_dir_all(dest).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(PkglinkError::io(format!("removing {}", dest.display()), e)),
            },
        },
    }
}

/// Coalesce trigger requests: one touch per quiet window
async fn debounce_touch(mut rx: mpsc::UnboundedReceiver<()>, trigger: PathBuf) {
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(REBUILD_DEBOUNCE, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => {
                    touch(&trigger);
                    return;
                }
                Err(_) => break,
            }
        }
        touch(&trigger);
    }
}

fn touch(path: &Path) {
    if let Err(e) = filetime::set_file_mtime(path, filetime::FileTime::now()) {
        debug!("Could not touch rebuild trigger {}: {e}", path.display());
    }
}
