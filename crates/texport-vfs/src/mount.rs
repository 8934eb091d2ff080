//! Package abstraction and mount implementations

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use texport_parsers::{ParseError, ParseOptions, Parser, Pk3Archive, Pk3Parser};

use crate::entry::PackageEntry;
use crate::path;

/// Result type for mount operations
pub type MountResult<T> = Result<T, MountError>;

/// Mount operation errors
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("Mount point not found: {0}")]
    NotFound(String),

    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Package error: {0}")]
    Parse(#[from] ParseError),
}

impl MountError {
    /// Whether the error means the requested file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. } | Self::NotFound(_))
    }
}

/// Read-only view of a game package
///
/// Only `name`, `entries` and `read_file` are required; the lookups have
/// default implementations over `entries` that mounts override with their
/// own indexes.
pub trait Package: Send + Sync {
    /// Get package name/label
    fn name(&self) -> &str;

    /// Get mount priority (higher = checked first)
    fn priority(&self) -> i32 {
        0
    }

    /// All file entries in package order
    fn entries(&self) -> Vec<PackageEntry>;

    /// Read the full contents of a file by exact (case-insensitive) name
    fn read_file(&self, name: &str) -> MountResult<Vec<u8>>;

    /// Find the entry for a texture reference
    ///
    /// A trailing `.tga`/`.jpg` on `pattern` is ignored. An entry whose name
    /// minus extension equals the pattern wins; otherwise the first entry
    /// starting with it is returned.
    fn find_file(&self, pattern: &str) -> Option<PackageEntry> {
        let entries = self.entries();
        path::best_texture_match(pattern, &entries).map(|(entry, _)| entry.clone())
    }

    /// Check if a file exists by exact (case-insensitive) name
    fn contains(&self, name: &str) -> bool {
        let name = path::normalize_name(name);
        self.entries().iter().any(|e| e.name.eq_ignore_ascii_case(&name))
    }

    /// Find all entries matching a glob pattern
    fn find(&self, pattern: &str) -> Vec<PackageEntry> {
        self.entries()
            .into_iter()
            .filter(|e| path::glob_match(pattern, &e.name))
            .collect()
    }

    /// Get total file count
    fn file_count(&self) -> usize {
        self.entries().len()
    }
}

/// Where a PK3 mount reads entry data from
#[derive(Debug, Clone)]
enum Pk3Source {
    /// Reopened on every read
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// PK3 package mount point
#[derive(Debug)]
pub struct Pk3Mount {
    name: String,
    priority: i32,
    source: Pk3Source,
    archive: Pk3Archive,
    entries: Vec<PackageEntry>,
    options: ParseOptions,
}

impl Pk3Mount {
    /// Open and index a PK3 file on disk
    pub fn open(archive_path: impl AsRef<Path>) -> MountResult<Self> {
        let archive_path = archive_path.as_ref();

        if !archive_path.is_file() {
            return Err(MountError::NotFound(archive_path.display().to_string()));
        }

        let archive = Pk3Parser::new().parse_file(archive_path)?;
        let name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive_path.display().to_string());

        tracing::debug!(package = %name, entries = archive.entry_count(), "Mounted PK3");
        Ok(Self::with_archive(name, Pk3Source::File(archive_path.to_path_buf()), archive))
    }

    /// Index a PK3 held in memory
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> MountResult<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let archive = Pk3Parser::new().parse(Cursor::new(&bytes[..]))?;
        Ok(Self::with_archive(name.into(), Pk3Source::Memory(bytes), archive))
    }

    fn with_archive(name: String, source: Pk3Source, archive: Pk3Archive) -> Self {
        let entries = archive
            .files()
            .map(|e| PackageEntry::new(e.path.clone(), e.uncompressed_size))
            .collect();

        Self {
            name,
            priority: 0,
            source,
            archive,
            entries,
            options: ParseOptions::default(),
        }
    }

    /// Set the mount priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the options used when extracting entries
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// The parsed package index
    pub fn archive(&self) -> &Pk3Archive {
        &self.archive
    }
}

impl Package for Pk3Mount {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn entries(&self) -> Vec<PackageEntry> {
        self.entries.clone()
    }

    fn read_file(&self, name: &str) -> MountResult<Vec<u8>> {
        let normalized = path::normalize_name(name);
        let entry = self
            .archive
            .get(&normalized)
            .filter(|e| !e.is_directory)
            .ok_or_else(|| MountError::PathNotFound { path: name.to_string() })?;

        let data = match &self.source {
            Pk3Source::File(archive_path) => {
                let mut reader = BufReader::new(File::open(archive_path)?);
                self.archive.read_entry(&mut reader, entry, &self.options)?
            }
            Pk3Source::Memory(bytes) => {
                self.archive.read_entry(&mut Cursor::new(&bytes[..]), entry, &self.options)?
            }
        };

        Ok(data)
    }

    fn find_file(&self, pattern: &str) -> Option<PackageEntry> {
        path::best_texture_match(pattern, &self.entries).map(|(entry, _)| entry.clone())
    }

    fn contains(&self, name: &str) -> bool {
        self.archive
            .get(&path::normalize_name(name))
            .is_some_and(|e| !e.is_directory)
    }

    fn find(&self, pattern: &str) -> Vec<PackageEntry> {
        self.entries
            .iter()
            .filter(|e| path::glob_match(pattern, &e.name))
            .cloned()
            .collect()
    }

    fn file_count(&self) -> usize {
        self.entries.len()
    }
}

/// Local filesystem mount point
///
/// The directory is indexed once at mount time. Nested `.pk3` files are not
/// listed; mount them separately.
#[derive(Debug)]
pub struct FilesystemMount {
    name: String,
    priority: i32,
    root_path: PathBuf,
    entries: Vec<PackageEntry>,
    /// Lowercased name to entry index
    index: HashMap<String, usize>,
}

impl FilesystemMount {
    /// Create a new filesystem mount
    pub fn new(name: impl Into<String>, root_path: impl AsRef<Path>) -> MountResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            return Err(MountError::NotFound(root_path.display().to_string()));
        }

        if !root_path.is_dir() {
            return Err(MountError::InvalidPath(format!(
                "{} is not a directory",
                root_path.display()
            )));
        }

        let mut entries = Vec::new();
        scan_directory(&root_path, "", &mut entries)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut index = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            index.entry(entry.name.to_lowercase()).or_insert(idx);
        }

        let name = name.into();
        tracing::debug!(package = %name, entries = entries.len(), "Mounted directory");

        Ok(Self {
            name,
            priority: 0,
            root_path,
            entries,
            index,
        })
    }

    /// Set the mount priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Get the mounted directory
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    fn lookup(&self, name: &str) -> Option<&PackageEntry> {
        self.index
            .get(&path::normalize_name(name).to_lowercase())
            .map(|idx| &self.entries[*idx])
    }
}

fn scan_directory(dir: &Path, prefix: &str, entries: &mut Vec<PackageEntry>) -> MountResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };

        if metadata.is_dir() {
            scan_directory(&entry.path(), &name, entries)?;
        } else if !path::get_extension(&name).is_some_and(|e| e.eq_ignore_ascii_case("pk3")) {
            entries.push(PackageEntry::new(name, metadata.len()));
        }
    }

    Ok(())
}

impl Package for FilesystemMount {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn entries(&self) -> Vec<PackageEntry> {
        self.entries.clone()
    }

    fn read_file(&self, name: &str) -> MountResult<Vec<u8>> {
        let entry = self
            .lookup(name)
            .ok_or_else(|| MountError::PathNotFound { path: name.to_string() })?;

        Ok(std::fs::read(self.root_path.join(&entry.name))?)
    }

    fn find_file(&self, pattern: &str) -> Option<PackageEntry> {
        path::best_texture_match(pattern, &self.entries).map(|(entry, _)| entry.clone())
    }

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn find(&self, pattern: &str) -> Vec<PackageEntry> {
        self.entries
            .iter()
            .filter(|e| path::glob_match(pattern, &e.name))
            .cloned()
            .collect()
    }

    fn file_count(&self) -> usize {
        self.entries.len()
    }
}
