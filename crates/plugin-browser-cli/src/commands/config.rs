//! CLI handlers for the `plugin-browser config` subcommand.

use std::process::ExitCode;

use anyhow::{Context, Result};
use plugin_browser_config::{ResolvedConfig, SettingsFile, ShowFormat};

use crate::session::{Overrides, Session};
use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: &str, section: Option<&str>) -> Result<()> {
    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    let output = resolved
        .show(show_format, section)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    println!(
        "{}",
        Theme::kv(
            "manifest URL in use",
            &SettingsFile::from_resolved(resolved).manifest_url()
        )
    );
    Ok(())
}

/// Persist a new manifest URL through the browser so the change is reported
/// like any other.
pub(crate) async fn set_url(resolved: &ResolvedConfig, overrides: &Overrides, url: &str) -> Result<ExitCode> {
    let overrides = Overrides {
        manifest_url: None,
        ..overrides.clone()
    };
    let session = Session::open(resolved, &overrides)?;
    let code = match session.browser().set_manifest_url(url) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    };
    session.close().await;
    Ok(code)
}

/// Forget the stored manifest URL.
pub(crate) fn reset_url(resolved: &ResolvedConfig) -> Result<()> {
    let settings = SettingsFile::from_resolved(resolved);
    settings
        .reset_manifest_url()
        .with_context(|| format!("failed to update {}", settings.path().display()))?;
    println!(
        "{}",
        Theme::success(&format!("Manifest URL reset to {}", settings.manifest_url()))
    );
    Ok(())
}
