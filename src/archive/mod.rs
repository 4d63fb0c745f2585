//! Package archive inspection and sandboxed extraction.
//!
//! Packages (`.dxt` / `.mcpb`) are zip containers. Before a single byte is
//! written to disk the whole entry table is validated by [`validate_entries`]:
//!
//! - the archive is non-empty and holds at most
//!   [`MAX_ARCHIVE_ENTRIES`](crate::constants::MAX_ARCHIVE_ENTRIES) entries
//! - every entry name, after `\` → `/` normalization, is relative, free of
//!   null bytes, drive letters and `..` segments
//! - no file declares more than
//!   [`MAX_ARCHIVE_ENTRY_BYTES`](crate::constants::MAX_ARCHIVE_ENTRY_BYTES)
//!   and all files together no more than
//!   [`MAX_ARCHIVE_TOTAL_BYTES`](crate::constants::MAX_ARCHIVE_TOTAL_BYTES)
//!
//! Only a [`ValidatedEntries`] value can be handed to
//! [`PackageArchive::extract_to`], and extraction never writes more bytes for
//! an entry than it declared.

use crate::constants::{
    MAX_ARCHIVE_ENTRIES, MAX_ARCHIVE_ENTRY_BYTES, MAX_ARCHIVE_TOTAL_BYTES, MAX_PACKAGE_FILE_BYTES,
    MIN_PACKAGE_FILE_BYTES, PACKAGE_EXTENSIONS, PACKAGE_MANIFEST_ENTRY,
};
use crate::core::{ForgeError, ForgeResult};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// An entry as declared in the archive's central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
    /// Declared uncompressed size.
    pub size: u64,
}

impl RawEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// An entry that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the archive.
    pub index: usize,
    /// Normalized relative name with `/` separators.
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// The full entry table of an archive that passed [`validate_entries`].
#[derive(Debug, Clone)]
pub struct ValidatedEntries {
    entries: Vec<ArchiveEntry>,
    total_bytes: u64,
}

impl ValidatedEntries {
    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Sum of declared file sizes.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| !e.is_dir && e.name == name)
    }
}

/// Normalize an entry name and reject unsafe ones.
pub fn normalize_entry_name(raw: &str) -> ForgeResult<String> {
    let name = raw.replace('\\', "/");

    if name.trim().is_empty() || name.contains('\0') {
        return Err(ForgeError::invalid_archive("entry with empty or null-containing name"));
    }
    if name.trim() != name {
        return Err(ForgeError::invalid_archive(format!(
            "entry name has leading or trailing whitespace: {name:?}"
        )));
    }
    if name.starts_with('/') || has_drive_prefix(&name) {
        return Err(ForgeError::invalid_archive(format!("absolute entry path: {name}")));
    }
    if name.split('/').any(|segment| segment == "..") {
        return Err(ForgeError::invalid_archive(format!("path traversal in entry: {name}")));
    }

    Ok(name)
}

/// `C:`, `C:foo` and `C:/foo` are all drive-rooted.
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate a complete entry table.
///
/// # Errors
///
/// Returns [`ForgeError::InvalidArchive`] on the first violation.
pub fn validate_entries(raw: &[RawEntry]) -> ForgeResult<ValidatedEntries> {
    if raw.is_empty() {
        return Err(ForgeError::invalid_archive("archive is empty"));
    }
    if raw.len() > MAX_ARCHIVE_ENTRIES {
        return Err(ForgeError::invalid_archive(format!(
            "archive has {} entries (limit {MAX_ARCHIVE_ENTRIES})",
            raw.len()
        )));
    }

    let mut entries = Vec::with_capacity(raw.len());
    let mut total_bytes: u64 = 0;

    for (index, entry) in raw.iter().enumerate() {
        let name = normalize_entry_name(&entry.name)?;

        if !entry.is_dir {
            if entry.size > MAX_ARCHIVE_ENTRY_BYTES {
                return Err(ForgeError::invalid_archive(format!(
                    "entry {name} declares {} bytes (limit {MAX_ARCHIVE_ENTRY_BYTES})",
                    entry.size
                )));
            }
            total_bytes = total_bytes.saturating_add(entry.size);
            if total_bytes > MAX_ARCHIVE_TOTAL_BYTES {
                return Err(ForgeError::invalid_archive(format!(
                    "archive expands beyond {MAX_ARCHIVE_TOTAL_BYTES} bytes"
                )));
            }
        }

        entries.push(ArchiveEntry {
            index,
            name,
            is_dir: entry.is_dir,
            size: entry.size,
        });
    }

    Ok(ValidatedEntries {
        entries,
        total_bytes,
    })
}

/// Static checks on a package file before any archive code runs: accepted
/// extension, existing regular file, size within bounds.
///
/// Returns the file size.
pub fn check_package_file(path: &Path) -> ForgeResult<u64> {
    let invalid = |reason: String| ForgeError::InvalidPackageFile {
        path: path.to_path_buf(),
        reason,
    };

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !PACKAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(invalid("only .dxt and .mcpb packages are supported".to_string()));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| invalid(format!("cannot read file metadata: {e}")))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file".to_string()));
    }

    let size = metadata.len();
    if !(MIN_PACKAGE_FILE_BYTES..=MAX_PACKAGE_FILE_BYTES).contains(&size) {
        return Err(invalid(format!(
            "size {size} bytes is outside {MIN_PACKAGE_FILE_BYTES}..={MAX_PACKAGE_FILE_BYTES}"
        )));
    }

    Ok(size)
}

/// Strip everything but normal components, refusing anything that could
/// leave the destination.
fn sanitize_archive_path(name: &str) -> ForgeResult<PathBuf> {
    let mut cleaned = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(ForgeError::invalid_archive(format!(
                    "entry escapes destination: {name}"
                )));
            }
            Component::CurDir => {}
            Component::Normal(part) => cleaned.push(part),
        }
    }
    Ok(cleaned)
}

/// An opened package archive.
pub struct PackageArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for PackageArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageArchive")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl PackageArchive {
    /// Open a zip container. Nothing is decompressed.
    pub fn open(path: &Path) -> ForgeResult<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| ForgeError::invalid_archive(format!("not a readable zip archive: {e}")))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the central directory without decompressing any entry.
    pub fn raw_entries(&mut self) -> ForgeResult<Vec<RawEntry>> {
        let mut raw = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index)?;
            raw.push(RawEntry {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                size: entry.size(),
            });
        }
        Ok(raw)
    }

    /// Validate the entry table. See [`validate_entries`].
    pub fn validate(&mut self) -> ForgeResult<ValidatedEntries> {
        let validated = validate_entries(&self.raw_entries()?)?;
        tracing::debug!(
            "Validated {} entries ({} bytes) in {}",
            validated.entries().len(),
            validated.total_bytes(),
            self.path.display()
        );
        Ok(validated)
    }

    /// Read the root `manifest.json`, bounded by its declared size.
    pub fn read_manifest(&mut self, validated: &ValidatedEntries) -> ForgeResult<Vec<u8>> {
        let entry = validated.find(PACKAGE_MANIFEST_ENTRY).ok_or_else(|| {
            ForgeError::manifest_invalid(format!("{PACKAGE_MANIFEST_ENTRY} not found in package"))
        })?;
        self.read_entry(entry)
    }

    fn read_entry(&mut self, entry: &ArchiveEntry) -> ForgeResult<Vec<u8>> {
        let file = self.archive.by_index(entry.index)?;
        let mut buffer = Vec::new();
        file.take(entry.size.saturating_add(1)).read_to_end(&mut buffer)?;
        if buffer.len() as u64 > entry.size {
            return Err(ForgeError::invalid_archive(format!(
                "entry {} is larger than declared",
                entry.name
            )));
        }
        Ok(buffer)
    }

    /// Extract validated entries under `dest`, overwriting existing files.
    ///
    /// Returns the number of files written.
    pub fn extract_to(&mut self, validated: &ValidatedEntries, dest: &Path) -> ForgeResult<usize> {
        std::fs::create_dir_all(dest)?;
        let mut written = 0;

        for entry in validated.entries() {
            let relative = sanitize_archive_path(&entry.name)?;
            if relative.as_os_str().is_empty() {
                continue;
            }
            let out = dest.join(&relative);

            if entry.is_dir {
                std::fs::create_dir_all(&out)?;
                continue;
            }
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = self.archive.by_index(entry.index)?;
            let mut out_file = File::create(&out)?;
            let copied = io::copy(&mut file.take(entry.size.saturating_add(1)), &mut out_file)?;
            if copied > entry.size {
                return Err(ForgeError::invalid_archive(format!(
                    "entry {} is larger than declared",
                    entry.name
                )));
            }
            written += 1;
        }

        tracing::debug!("Extracted {} files to {}", written, dest.display());
        Ok(written)
    }
}
