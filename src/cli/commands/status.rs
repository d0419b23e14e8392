//! Status command - show the packages currently linked into this project

use crate::error::{PkglinkError, PkglinkResult};
use crate::project::Project;
use crate::state;
use console::style;

/// Execute the status command
pub async fn execute() -> PkglinkResult<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| PkglinkError::io("getting current directory", e))?;
    let project = Project::resolve(&cwd)?;

    let linked = state::linked_packages(&project);
    if linked.is_empty() {
        println!("No packages are currently linked.");
        return Ok(());
    }

    println!(
        "Linked into {}:",
        style(project.root.display()).cyan()
    );
    for package in linked {
        println!(
            "  {} {} {}",
            style("●").green(),
            style(&package.name).bold(),
            style(package.root.display()).dim()
        );
    }
    Ok(())
}
