//! UI module for consistent CLI experience
//!
//! Uses `cliclack` for interactive spinners and prompts with automatic
//! fallback to plain output in CI/non-interactive environments, and an
//! `indicatif` steady-tick spinner for the long-running installer child.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{key_value, note, remark, step_error, step_info, step_ok, step_warn};
pub use progress::{InstallProgress, TaskSpinner};
pub use prompts::multiselect;
pub use theme::{init_theme, PkglinkTheme};
