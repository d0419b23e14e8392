//! Link command - install local packages and keep them in sync

use crate::cleanup::CleanupRegistry;
use crate::cli::args::LinkArgs;
use crate::config::ConfigManager;
use crate::discovery;
use crate::error::{PkglinkError, PkglinkResult};
use crate::linker::Linker;
use crate::package::Package;
use crate::project::Project;
use crate::ui::{self, UiContext};
use console::{style, Term};
use std::path::PathBuf;
use tracing::debug;

/// Execute the link command
pub async fn execute(args: LinkArgs) -> PkglinkResult<()> {
    let ctx = UiContext::detect();
    let cleanups = CleanupRegistry::new();
    install_interrupt_handler(&cleanups);

    if ctx.use_fancy_output() {
        Term::stdout().clear_screen().ok();
    }

    let cwd = std::env::current_dir()
        .map_err(|e| PkglinkError::io("getting current directory", e))?;
    let project = Project::resolve(&cwd)?;
    debug!("Project root: {}", project.root.display());

    // The cache directory holds nothing worth keeping between runs
    let cache_dir = project.cache_dir.clone();
    cleanups.register(move || {
        let _ = std::fs::remove_dir_all(&cache_dir);
    });

    let paths = if args.paths.is_empty() {
        select_packages(&ctx).await?
    } else {
        args.paths
    };

    let packages = paths
        .iter()
        .map(|path| Package::resolve(path))
        .collect::<PkglinkResult<Vec<_>>>()?;

    Linker::new(project, packages, cleanups, ctx)?.run().await
}

/// Offer the packages discovered under the configured roots
async fn select_packages(ctx: &UiContext) -> PkglinkResult<Vec<PathBuf>> {
    let config = ConfigManager::new().load().await?;
    if config.packages_roots.is_empty() {
        return Err(PkglinkError::NoPackagesConfigured);
    }

    let candidates = discovery::find_packages(&config.packages_roots);
    if candidates.is_empty() {
        return Err(PkglinkError::NoPackagesFound);
    }
    if !ctx.is_interactive() {
        return Err(PkglinkError::SelectionUnavailable);
    }

    let options = candidates
        .into_iter()
        .map(|c| {
            let label = c.name.clone();
            let hint = c.root.display().to_string();
            (c.root, label, hint)
        })
        .collect();
    ui::multiselect(ctx, "Select package(s) to link", options).await
}

/// Run pending cleanups on Ctrl-C, then exit gracefully
fn install_interrupt_handler(cleanups: &CleanupRegistry) {
    let cleanups = cleanups.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cleanups.run_all();
            eprintln!(
                "\n{}",
                style(
                    " To fully revert, a forced reinstall (yarn install --force \
                     or npm install --force) may be necessary. "
                )
                .yellow()
                .reverse()
            );
            std::process::exit(0);
        }
    });
}
