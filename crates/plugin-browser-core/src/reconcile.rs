//! Join of the available catalog against installed folders.
//!
//! [`reconcile`] is pure: it takes two freshly produced sets and returns a
//! deterministic, sorted view. Results are never cached across a mutation.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::manifest::AvailablePlugin;
use crate::scanner::InstalledPlugin;

/// One row of the reconciled view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReconciledEntry {
    /// Listed in the manifest, no matching folder on disk.
    AvailableOnly {
        /// The catalog entry.
        available: AvailablePlugin,
    },
    /// A folder with no matching manifest entry (orphaned or unknown).
    InstalledOnly {
        /// The folder on disk.
        installed: InstalledPlugin,
    },
    /// Listed in the manifest and present on disk.
    InstalledAndAvailable {
        /// The catalog entry.
        available: AvailablePlugin,
        /// The folder on disk.
        installed: InstalledPlugin,
        /// The manifest version is newer than the recorded installed version.
        upgrade_available: bool,
    },
}

impl ReconciledEntry {
    /// Display name: the manifest name when known, otherwise the folder's base name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::AvailableOnly { available } | Self::InstalledAndAvailable { available, .. } => {
                &available.name
            },
            Self::InstalledOnly { installed } => installed.base_name(),
        }
    }

    /// The catalog entry, if this row has one.
    #[must_use]
    pub fn available(&self) -> Option<&AvailablePlugin> {
        match self {
            Self::AvailableOnly { available } | Self::InstalledAndAvailable { available, .. } => {
                Some(available)
            },
            Self::InstalledOnly { .. } => None,
        }
    }

    /// The installed folder, if this row has one.
    #[must_use]
    pub fn installed(&self) -> Option<&InstalledPlugin> {
        match self {
            Self::InstalledOnly { installed } | Self::InstalledAndAvailable { installed, .. } => {
                Some(installed)
            },
            Self::AvailableOnly { .. } => None,
        }
    }

    fn sort_key(&self) -> (String, &str, &str) {
        let id = self.available().map_or("", |a| a.id.as_str());
        let folder = self.installed().map_or("", |i| i.folder_name.as_str());
        (self.display_name().to_lowercase(), if id.is_empty() { folder } else { id }, folder)
    }
}

/// Join `available` and `installed` into one ordered list.
///
/// Each installed folder's `inferred_id` is matched to a manifest id exactly,
/// then ASCII case-insensitively; every exact match is settled before any
/// case-insensitive one. A manifest entry claims at most one folder (the
/// first by folder name within each pass); any further folders mapping to the same id
/// surface as [`ReconciledEntry::InstalledOnly`] so nothing on disk is hidden.
///
/// Output is sorted by display name (case-insensitive), then id or folder
/// name, then folder name, so identical inputs always give identical output.
#[must_use]
pub fn reconcile(available: &[AvailablePlugin], installed: &[InstalledPlugin]) -> Vec<ReconciledEntry> {
    let exact: HashMap<&str, usize> = available
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();
    let mut folded: HashMap<String, usize> = HashMap::new();
    for (i, p) in available.iter().enumerate() {
        folded.entry(p.id.to_ascii_lowercase()).or_insert(i);
    }

    let mut installed_sorted: Vec<&InstalledPlugin> = installed.iter().collect();
    installed_sorted.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));

    let mut claimed: Vec<Option<&InstalledPlugin>> = vec![None; available.len()];
    let mut unmatched: Vec<&InstalledPlugin> = Vec::new();

    // Exact ids claim their slot before any case-insensitive match can.
    for folder in installed_sorted {
        let index = folder.inferred_id.as_deref().and_then(|id| exact.get(id)).copied();
        match index.and_then(|i| claimed.get_mut(i)) {
            Some(slot) if slot.is_none() => *slot = Some(folder),
            _ => unmatched.push(folder),
        }
    }

    let mut entries = Vec::with_capacity(available.len().saturating_add(installed.len()));
    for folder in unmatched {
        let index = folder
            .inferred_id
            .as_deref()
            .and_then(|id| folded.get(&id.to_ascii_lowercase()))
            .copied();
        match index.and_then(|i| claimed.get_mut(i)) {
            Some(slot) if slot.is_none() => *slot = Some(folder),
            _ => entries.push(ReconciledEntry::InstalledOnly {
                installed: folder.clone(),
            }),
        }
    }

    for (plugin, slot) in available.iter().zip(claimed) {
        entries.push(match slot {
            Some(folder) => ReconciledEntry::InstalledAndAvailable {
                upgrade_available: folder
                    .installed_version
                    .as_deref()
                    .is_some_and(|v| compare_versions(&plugin.version, v) == Ordering::Greater),
                available: plugin.clone(),
                installed: folder.clone(),
            },
            None => ReconciledEntry::AvailableOnly {
                available: plugin.clone(),
            },
        });
    }

    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    entries
}

/// Best-effort version comparison.
///
/// Splits on `.` (ignoring a leading `v`) and compares segment by segment:
/// numerically when both segments are integers, lexicographically otherwise.
/// When one version is a prefix of the other, the shorter one is older.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let trim = |v: &str| -> String { v.trim().trim_start_matches(['v', 'V']).to_string() };
    let (a, b) = (trim(a), trim(b));
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}
