//! Install failures must leave the plugin root exactly as it was.

mod common;

use common::{BrowserHarness, count_level, download_url, traversal_zip};
use plugin_browser_core::{AvailablePlugin, MemoryTransport, Operation, PluginBrowserError};
use plugin_browser_events::StatusLevel;

fn plugin(id: &str) -> AvailablePlugin {
    AvailablePlugin {
        id: id.into(),
        name: format!("Plugin {id}"),
        author: "tests".into(),
        version: "1.0.0".into(),
        description: String::new(),
        download_url: download_url(id),
        compatibility: None,
        repository_url: None,
    }
}

#[tokio::test]
async fn test_corrupt_archive_leaves_listing_unchanged() {
    let mut harness = BrowserHarness::with_transport(
        MemoryTransport::new().with_body(download_url("foo"), b"PK\x03\x04 this is not really a zip".to_vec()),
    );
    harness.make_folder("existing");
    let before = harness.listing();

    let err = harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap_err();

    assert!(matches!(err, PluginBrowserError::CorruptArchive { .. }), "got {err}");
    assert_eq!(harness.listing(), before);
    assert_eq!(harness.parent_listing(), vec!["plugins"]);

    let events = harness.events();
    assert_eq!(count_level(&events, StatusLevel::Error), 1);
    assert!(events.iter().all(|e| !e.restart_required));
}

#[tokio::test]
async fn test_traversal_archive_creates_no_files() {
    let mut harness =
        BrowserHarness::with_transport(MemoryTransport::new().with_body(download_url("foo"), traversal_zip()));

    let err = harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap_err();

    assert!(matches!(err, PluginBrowserError::UnsafeArchive { .. }), "got {err}");
    assert!(harness.listing().is_empty());
    assert_eq!(harness.parent_listing(), vec!["plugins"]);
    assert!(!harness.root.join("escape.txt").exists());
    assert!(!harness.root.parent().unwrap().join("escape.txt").exists());
    assert_eq!(count_level(&harness.events(), StatusLevel::Error), 1);
}

#[tokio::test]
async fn test_install_over_existing_folder_never_modifies_it() {
    let harness = BrowserHarness::with_plugins(&["foo"]);
    let existing = harness.make_folder("foo");
    std::fs::write(existing.join("settings.ini"), "user data").unwrap();

    let err = harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap_err();

    assert!(matches!(err, PluginBrowserError::AlreadyInstalled { .. }));
    assert_eq!(common::names(&existing), vec!["load.py", "settings.ini"]);
    assert_eq!(std::fs::read_to_string(existing.join("load.py")).unwrap(), "# hand made");
    assert_eq!(harness.transport.hits(&download_url("foo")), 0);
}

#[tokio::test]
async fn test_install_when_disabled_variant_exists() {
    let harness = BrowserHarness::with_plugins(&["foo"]);
    harness.make_folder("foo.disabled");

    let err = harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap_err();

    assert!(matches!(err, PluginBrowserError::AlreadyInstalled { .. }));
    assert_eq!(harness.listing(), vec!["foo.disabled"]);
}

#[tokio::test]
async fn test_network_failure_is_reported_distinctly() {
    let mut harness =
        BrowserHarness::with_transport(MemoryTransport::new().with_status(download_url("foo"), 503));

    let err = harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap_err();

    assert!(matches!(err, PluginBrowserError::Network { .. }));
    assert!(harness.listing().is_empty());
    assert_eq!(harness.parent_listing(), vec!["plugins"]);
    assert_eq!(count_level(&harness.events(), StatusLevel::Error), 1);
}

#[tokio::test]
async fn test_installed_plugin_carries_receipt() {
    let harness = BrowserHarness::with_plugins(&["foo"]);
    harness
        .browser
        .execute(Operation::Install(plugin("foo")))
        .await
        .unwrap();

    let installed = harness.browser.scan_installed().await.unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].inferred_id.as_deref(), Some("foo"));
    assert_eq!(installed[0].installed_version.as_deref(), Some("1.0.0"));
    assert!(installed[0].has_entry_point);
}
