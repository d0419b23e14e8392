//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{PkglinkError, PkglinkResult};

/// Prompt for a multi-selection from a list of options
///
/// Options are `(value, label, hint)` triples. Fails with
/// `SelectionUnavailable` when there is no terminal to prompt on.
pub async fn multiselect<T: Clone + Send + Eq + 'static>(
    ctx: &UiContext,
    message: &str,
    options: Vec<(T, String, String)>,
) -> PkglinkResult<Vec<T>> {
    if !ctx.is_interactive() {
        return Err(PkglinkError::SelectionUnavailable);
    }

    // Run blocking cliclack prompt in spawn_blocking
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let mut select = cliclack::multiselect(&message);
        for (value, label, hint) in options {
            select = select.item(value, label, hint);
        }
        select.interact()
    })
    .await
    .map_err(|e| PkglinkError::User(format!("Prompt task failed: {e}")))?;

    result.map_err(|e| PkglinkError::User(format!("Prompt failed: {e}")))
}
