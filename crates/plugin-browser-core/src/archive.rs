//! Zip validation and safe extraction.
//!
//! [`PluginArchive::open`] reads and checks the entire archive in memory
//! before anything is written: structure, entry paths, entry types, size and
//! count limits, and every entry's CRC. Only an archive that passes all of
//! that can be extracted, so a corrupt or hostile download never produces a
//! single file on disk.

use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{PluginBrowserError, PluginBrowserResult};

/// Maximum number of entries allowed in an archive.
pub const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total extracted size (500 MB), zip bomb protection.
pub const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

/// Entry-name used in errors for whole-archive limits.
const WHOLE_ARCHIVE: &str = "<archive>";

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Limits applied while validating an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum total uncompressed size in bytes.
    pub max_extracted_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRY_COUNT,
            max_extracted_bytes: MAX_EXTRACTED_SIZE,
        }
    }
}

#[derive(Debug)]
struct PlannedEntry {
    index: usize,
    name: String,
    relative: PathBuf,
    is_dir: bool,
}

/// A fully validated zip archive, ready to extract.
pub struct PluginArchive<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    entries: Vec<PlannedEntry>,
    stripped_root: Option<String>,
}

impl std::fmt::Debug for PluginArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginArchive")
            .field("entries", &self.entries.len())
            .field("stripped_root", &self.stripped_root)
            .finish_non_exhaustive()
    }
}

impl<'a> PluginArchive<'a> {
    /// Parse and validate `bytes` as a plugin archive.
    ///
    /// # Security
    ///
    /// - Rejects absolute paths and `..` components
    /// - Rejects symbolic links
    /// - Limits entry count and total uncompressed size
    /// - Decompresses every entry and verifies its checksum
    ///
    /// # Errors
    ///
    /// [`PluginBrowserError::CorruptArchive`] if the bytes are not a readable
    /// zip or contain no files, [`PluginBrowserError::UnsafeArchive`] for
    /// entries that could escape the destination or exceed a limit.
    pub fn open(bytes: &'a [u8], limits: &ArchiveLimits) -> PluginBrowserResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| PluginBrowserError::corrupt(e.to_string()))?;

        if archive.is_empty() {
            return Err(PluginBrowserError::corrupt("archive is empty"));
        }
        if archive.len() > limits.max_entries {
            return Err(PluginBrowserError::unsafe_entry(
                WHOLE_ARCHIVE,
                format!("archive exceeds maximum entry count ({})", limits.max_entries),
            ));
        }

        let mut entries = Vec::with_capacity(archive.len());
        let mut total_size: u64 = 0;

        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| PluginBrowserError::corrupt(format!("entry {index}: {e}")))?;
            let name = file.name().to_string();

            if file.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
                return Err(PluginBrowserError::unsafe_entry(
                    name,
                    "symbolic links are not allowed",
                ));
            }

            let relative = validate_entry_path(&name)?;

            let declared = file.size();
            total_size = total_size.saturating_add(declared);
            if total_size > limits.max_extracted_bytes {
                return Err(PluginBrowserError::unsafe_entry(
                    WHOLE_ARCHIVE,
                    format!(
                        "archive exceeds maximum extracted size ({} bytes)",
                        limits.max_extracted_bytes
                    ),
                ));
            }

            // Reading to the end is what verifies the CRC.
            let read = io::copy(
                &mut Read::by_ref(&mut file).take(declared.saturating_add(1)),
                &mut io::sink(),
            )
            .map_err(|e| PluginBrowserError::corrupt(format!("{name}: {e}")))?;
            if read > declared {
                return Err(PluginBrowserError::unsafe_entry(
                    name,
                    "entry is larger than its declared size",
                ));
            }

            let is_dir = file.is_dir();
            drop(file);

            if relative.as_os_str().is_empty() {
                continue;
            }
            entries.push(PlannedEntry {
                index,
                name,
                relative,
                is_dir,
            });
        }

        if !entries.iter().any(|e| !e.is_dir) {
            return Err(PluginBrowserError::corrupt("archive contains no files"));
        }

        let stripped_root = common_root(&entries);
        if let Some(root) = &stripped_root {
            for entry in &mut entries {
                entry.relative = entry
                    .relative
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
            }
            entries.retain(|e| !e.relative.as_os_str().is_empty());
        }

        debug!(
            entries = entries.len(),
            total_size,
            stripped_root = stripped_root.as_deref().unwrap_or(""),
            "Validated plugin archive"
        );

        Ok(Self {
            archive,
            entries,
            stripped_root,
        })
    }

    /// The single top-level directory removed during extraction, if any.
    #[must_use]
    pub fn stripped_root(&self) -> Option<&str> {
        self.stripped_root.as_deref()
    }

    /// Number of files and directories that extraction will create.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Extract into `dest`, which must already exist and be empty.
    ///
    /// # Errors
    ///
    /// [`PluginBrowserError::DirectoryAccess`] if a file cannot be written,
    /// [`PluginBrowserError::UnsafeArchive`] if a resolved path escapes
    /// `dest`.
    pub fn extract_to(mut self, dest: &Path) -> PluginBrowserResult<()> {
        let dest = dest
            .canonicalize()
            .map_err(|e| PluginBrowserError::directory(dest, e))?;

        for entry in &self.entries {
            let target = dest.join(&entry.relative);

            if entry.is_dir {
                std::fs::create_dir_all(&target)
                    .map_err(|e| PluginBrowserError::directory(&target, e))?;
                continue;
            }

            let parent = target.parent().unwrap_or(&dest);
            std::fs::create_dir_all(parent).map_err(|e| PluginBrowserError::directory(parent, e))?;

            // Path components were already checked; this catches escapes
            // through anything that already existed under dest.
            let canonical_parent = parent
                .canonicalize()
                .map_err(|e| PluginBrowserError::directory(parent, e))?;
            if !canonical_parent.starts_with(&dest) {
                return Err(PluginBrowserError::unsafe_entry(
                    entry.name.as_str(),
                    "path escapes the staging directory",
                ));
            }

            let mut file = self
                .archive
                .by_index(entry.index)
                .map_err(|e| PluginBrowserError::corrupt(format!("{}: {e}", entry.name)))?;
            let mut out =
                std::fs::File::create(&target).map_err(|e| PluginBrowserError::directory(&target, e))?;
            io::copy(&mut file, &mut out).map_err(|e| PluginBrowserError::directory(&target, e))?;
        }

        Ok(())
    }
}

/// Turn a raw entry name into a relative path, rejecting anything that could
/// leave the destination.
///
/// Backslashes are treated as separators. `.` components are dropped, so an
/// entry like `./` yields an empty path.
fn validate_entry_path(name: &str) -> PluginBrowserResult<PathBuf> {
    let escape = || PluginBrowserError::unsafe_entry(name, "path escapes the staging directory");

    if name.contains('\0') {
        return Err(PluginBrowserError::unsafe_entry(name, "entry name contains a NUL byte"));
    }

    let normalized = name.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() || normalized.starts_with('/') {
        return Err(escape());
    }
    // Drive-letter names like `C:foo` are absolute on Windows only.
    if normalized.as_bytes().get(1) == Some(&b':') {
        return Err(escape());
    }

    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escape());
            },
        }
    }
    Ok(relative)
}

/// The directory every entry lives under, when there is exactly one and no
/// file sits at the top level.
fn common_root(entries: &[PlannedEntry]) -> Option<String> {
    let mut root: Option<&std::ffi::OsStr> = None;
    for entry in entries {
        let mut components = entry.relative.components();
        let first = components.next()?.as_os_str();
        let nested = components.next().is_some();
        if !entry.is_dir && !nested {
            return None;
        }
        match root {
            None => root = Some(first),
            Some(r) if r == first => {},
            Some(_) => return None,
        }
    }
    root.and_then(|r| r.to_str()).map(str::to_string)
}
