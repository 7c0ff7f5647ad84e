//! Mutating commands: `install`, `enable`, `disable` and `remove`.

use std::process::ExitCode;

use anyhow::Result;
use plugin_browser_core::Operation;

use super::find_available;
use crate::session::Session;
use crate::theme::Theme;

/// Install the catalog entry `id`.
pub(crate) async fn install(session: &Session, id: &str) -> Result<ExitCode> {
    let Ok(plugins) = session.browser().refresh_available().await else {
        return Ok(ExitCode::FAILURE);
    };

    let Some(plugin) = find_available(&plugins, id) else {
        eprintln!("{}", Theme::error(&format!("No plugin with id '{id}' in the catalog")));
        return Ok(ExitCode::FAILURE);
    };

    run(session, Operation::Install(plugin.clone())).await
}

/// Run a folder operation and map the outcome to an exit code.
pub(crate) async fn run(session: &Session, operation: Operation) -> Result<ExitCode> {
    Ok(match session.browser().execute(operation).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}
