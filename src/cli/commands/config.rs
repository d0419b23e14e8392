//! Config command - show or edit where pkglink looks for packages

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::ConfigManager;
use crate::error::{PkglinkError, PkglinkResult};
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs) -> PkglinkResult<()> {
    let ctx = UiContext::detect();
    let manager = ConfigManager::new();

    match args.action {
        ConfigAction::Show => {
            let config = manager.load().await?;
            ui::key_value(&ctx, "config", &manager.path().display().to_string());
            if config.packages_roots.is_empty() {
                ui::remark(&ctx, "No package roots configured");
            } else {
                for root in &config.packages_roots {
                    ui::key_value(&ctx, "root", &root.display().to_string());
                }
            }
        }
        ConfigAction::Add { root } => {
            let root = std::fs::canonicalize(&root)
                .map_err(|_| PkglinkError::User(format!("{} is not a directory", root.display())))?;
            if !root.is_dir() {
                return Err(PkglinkError::User(format!(
                    "{} is not a directory",
                    root.display()
                )));
            }

            let mut config = manager.load().await?;
            if config.packages_roots.contains(&root) {
                ui::remark(&ctx, "Already configured");
                return Ok(());
            }
            config.packages_roots.push(root.clone());
            manager.save(&config).await?;
            ui::step_ok(&ctx, &format!("Added {}", root.display()));
        }
        ConfigAction::Remove { root } => {
            let resolved = std::fs::canonicalize(&root).unwrap_or(root);
            let mut config = manager.load().await?;
            let before = config.packages_roots.len();
            config.packages_roots.retain(|r| *r != resolved);
            if config.packages_roots.len() == before {
                return Err(PkglinkError::User(format!(
                    "{} is not a configured root",
                    resolved.display()
                )));
            }
            manager.save(&config).await?;
            ui::step_ok(&ctx, &format!("Removed {}", resolved.display()));
        }
    }
    Ok(())
}
