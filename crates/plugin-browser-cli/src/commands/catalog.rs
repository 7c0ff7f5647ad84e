//! Read-only commands: `available`, `list` and `repo`.

use std::process::ExitCode;

use anyhow::Result;
use plugin_browser_core::scanner::ENTRY_POINT_FILE;
use plugin_browser_core::{AvailablePlugin, CatalogView, ReconciledEntry};

use super::find_available;
use crate::session::Session;
use crate::theme::Theme;

/// Print the remote catalog.
pub(crate) async fn available(session: &Session, json: bool) -> Result<ExitCode> {
    let Ok(plugins) = session.browser().refresh_available().await else {
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", Theme::header("Available plugins"));
    println!("{}", Theme::separator());
    for plugin in &plugins {
        print_available(plugin);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_available(plugin: &AvailablePlugin) {
    println!(
        "{} {} {}",
        plugin.name,
        Theme::dimmed(&format!("v{}", plugin.version.trim_start_matches('v'))),
        Theme::dimmed(&format!("({})", plugin.id))
    );
    println!("  {}", Theme::kv("author", &plugin.author));
    if let Some(compatibility) = &plugin.compatibility {
        println!("  {}", Theme::kv("compatibility", compatibility));
    }
    if !plugin.description.is_empty() {
        println!("  {}", plugin.description);
    }
}

/// Print the reconciled view of catalog and plugin directory.
pub(crate) async fn list(session: &Session, json: bool) -> Result<ExitCode> {
    let Ok(view) = session.browser().refresh().await else {
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(ExitCode::SUCCESS);
    }

    print_view(&view, &session.browser().plugin_root().display().to_string());
    Ok(ExitCode::SUCCESS)
}

fn print_view(view: &CatalogView, root: &str) {
    println!("{}", Theme::header("Plugins"));
    println!("{}", Theme::dimmed(root));
    println!("{}", Theme::separator());

    if view.entries.is_empty() {
        println!("{}", Theme::dimmed("Nothing available or installed."));
    }

    for entry in &view.entries {
        println!("{}  {}", Theme::state_badge(entry), describe(entry));
        if let Some(installed) = entry.installed()
            && !installed.has_entry_point
        {
            println!(
                "{}  {}",
                Theme::badge_gap(),
                Theme::warning(&format!("{} has no {ENTRY_POINT_FILE}", installed.folder_name))
            );
        }
    }

    if let Some(error) = &view.manifest_error {
        println!();
        println!(
            "{}",
            Theme::warning(&format!("Catalog unavailable, showing installed folders only: {error}"))
        );
    }
}

fn describe(entry: &ReconciledEntry) -> String {
    match entry {
        ReconciledEntry::AvailableOnly { available } => {
            format!("{} {}", available.name, Theme::dimmed(&available.version))
        },
        ReconciledEntry::InstalledOnly { installed } => format!(
            "{} {}",
            installed.base_name(),
            Theme::dimmed(&format!("[{}]", installed.folder_name))
        ),
        ReconciledEntry::InstalledAndAvailable {
            available,
            installed,
            upgrade_available,
        } => {
            let version = match (&installed.installed_version, upgrade_available) {
                (Some(current), true) => format!("{current} → {}", available.version),
                (Some(current), false) => current.clone(),
                (None, _) => available.version.clone(),
            };
            format!(
                "{} {} {}",
                available.name,
                Theme::dimmed(&version),
                Theme::dimmed(&format!("[{}]", installed.folder_name))
            )
        },
    }
}

/// Print a plugin's repository URL and open it in the system browser.
pub(crate) async fn repo(session: &Session, id: &str) -> Result<ExitCode> {
    let Ok(plugins) = session.browser().refresh_available().await else {
        return Ok(ExitCode::FAILURE);
    };

    let Some(plugin) = find_available(&plugins, id) else {
        eprintln!("{}", Theme::error(&format!("No plugin with id '{id}' in the catalog")));
        return Ok(ExitCode::FAILURE);
    };

    let Some(url) = &plugin.repository_url else {
        eprintln!(
            "{}",
            Theme::warning(&format!("{} does not list a repository", plugin.name))
        );
        return Ok(ExitCode::SUCCESS);
    };

    println!("{url}");
    if let Err(e) = webbrowser::open(url) {
        eprintln!("{}", Theme::warning(&format!("Could not open a browser: {e}")));
    }
    Ok(ExitCode::SUCCESS)
}
