//! Supersession of in-flight requests and per-folder mutual exclusion.

mod common;

use std::time::Duration;

use common::{BrowserHarness, MANIFEST_URL, SLOW, count_level, download_url, manifest_json, plugin_zip};
use plugin_browser_core::{MemoryTransport, Operation, PluginBrowserError, SettingsStore};
use plugin_browser_events::StatusLevel;

fn zip() -> Vec<u8> {
    plugin_zip("top", &[("load.py", "x")])
}

#[tokio::test]
async fn test_second_mutation_on_same_folder_conflicts() {
    let transport = MemoryTransport::new()
        .with_body(MANIFEST_URL, manifest_json(&["foo"]))
        .with_body(download_url("foo"), zip())
        .with_delay(download_url("foo"), Duration::from_millis(500));
    let harness = BrowserHarness::with_transport(transport);
    let available = harness.browser.refresh_available().await.unwrap();

    let browser = harness.browser.clone();
    let plugin = available[0].clone();
    let install = tokio::spawn(async move { browser.execute(Operation::Install(plugin)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = harness
        .browser
        .execute(Operation::Remove("foo.disabled".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PluginBrowserError::Conflict { .. }), "got {err}");

    install.await.unwrap().unwrap();
    assert_eq!(harness.listing(), vec!["foo"]);
}

#[tokio::test]
async fn test_newer_install_supersedes_in_flight_download() {
    let transport = MemoryTransport::new()
        .with_body(MANIFEST_URL, manifest_json(&["slow", "fast"]))
        .with_body(download_url("slow"), zip())
        .with_delay(download_url("slow"), SLOW)
        .with_body(download_url("fast"), zip());
    let mut harness = BrowserHarness::with_transport(transport);
    let available = harness.browser.refresh_available().await.unwrap();
    let slow = available.iter().find(|p| p.id == "slow").unwrap().clone();
    let fast = available.iter().find(|p| p.id == "fast").unwrap().clone();

    let browser = harness.browser.clone();
    let first = tokio::spawn(async move { browser.execute(Operation::Install(slow)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness.browser.execute(Operation::Install(fast)).await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("superseded install should finish promptly")
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled());

    assert_eq!(harness.listing(), vec!["fast"]);
    assert_eq!(harness.parent_listing(), vec!["plugins"]);

    let events = harness.events();
    assert_eq!(count_level(&events, StatusLevel::Error), 0);
    assert!(
        events
            .iter()
            .any(|e| e.level == StatusLevel::Warning && e.message.contains("superseded"))
    );
}

#[tokio::test]
async fn test_newer_refresh_supersedes_in_flight_fetch() {
    let slow_url = "https://plugins.test/slow-manifest.json";
    let transport = MemoryTransport::new()
        .with_body(slow_url, manifest_json(&["a"]))
        .with_delay(slow_url, SLOW)
        .with_body(MANIFEST_URL, manifest_json(&["a", "b"]));
    let harness = BrowserHarness::with_transport(transport);
    harness.settings.set_manifest_url(slow_url).unwrap();

    let browser = harness.browser.clone();
    let first = tokio::spawn(async move { browser.refresh_available().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness.settings.set_manifest_url(MANIFEST_URL).unwrap();
    let latest = harness.browser.refresh_available().await.unwrap();
    assert_eq!(latest.len(), 2);

    let err = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("superseded refresh should finish promptly")
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled());
}
