//! VFS tree implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entry::PackageEntry;
use crate::mount::{FilesystemMount, MountError, MountResult, Package, Pk3Mount};
use crate::path::{self, TextureMatch};

/// Priority given to loose directories mounted next to their PK3 files
pub const LOOSE_FILE_PRIORITY: i32 = 1;

/// Virtual File System tree
/// Overlays multiple packages and exposes them as one
pub struct VfsTree {
    name: String,
    /// Mounted packages (higher priority first, newest first within a priority)
    mounts: RwLock<Vec<Arc<dyn Package>>>,
}

impl VfsTree {
    /// Create a new empty VFS tree
    pub fn new() -> Self {
        Self {
            name: "vfs".to_string(),
            mounts: RwLock::new(Vec::new()),
        }
    }

    /// Build a tree from package paths
    ///
    /// Each path may be a `.pk3` file or a directory. A directory has its
    /// `.pk3` files mounted in lexical order (later names override earlier
    /// ones) and its loose files mounted above them.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> MountResult<Self> {
        let vfs = Self::new();

        for package_path in paths {
            let package_path = package_path.as_ref();

            if package_path.is_dir() {
                for pk3 in list_pk3_files(package_path)? {
                    vfs.add_mount(Arc::new(Pk3Mount::open(&pk3)?));
                }

                let label = package_path.display().to_string();
                let loose = FilesystemMount::new(label, package_path)?.with_priority(LOOSE_FILE_PRIORITY);
                vfs.add_mount(Arc::new(loose));
            } else if package_path.is_file() {
                vfs.add_mount(Arc::new(Pk3Mount::open(package_path)?));
            } else {
                return Err(MountError::NotFound(package_path.display().to_string()));
            }
        }

        tracing::info!(
            mounts = vfs.mount_count(),
            files = vfs.total_file_count(),
            "Package tree ready"
        );

        Ok(vfs)
    }

    /// Add a mount point
    ///
    /// It is searched before every existing mount of the same or lower priority.
    pub fn add_mount(&self, mount: Arc<dyn Package>) {
        let mut mounts = self.mounts.write();
        let priority = mount.priority();
        let position = mounts
            .iter()
            .position(|m| m.priority() <= priority)
            .unwrap_or(mounts.len());
        mounts.insert(position, mount);
    }

    /// Get number of mounted sources
    pub fn mount_count(&self) -> usize {
        self.mounts.read().len()
    }

    /// Get total file count across all mounts, overridden files included
    pub fn total_file_count(&self) -> usize {
        self.mounts.read().iter().map(|m| m.file_count()).sum()
    }
}

fn list_pk3_files(dir: &Path) -> MountResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry_path = entry?.path();
        let is_pk3 = entry_path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pk3"));

        if is_pk3 && entry_path.is_file() {
            files.push(entry_path);
        }
    }

    files.sort();
    Ok(files)
}

impl Default for VfsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Package for VfsTree {
    fn name(&self) -> &str {
        &self.name
    }

    /// Merged listing; an overridden file appears once, from its winning mount
    fn entries(&self) -> Vec<PackageEntry> {
        let mounts = self.mounts.read();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for mount in mounts.iter() {
            for entry in mount.entries() {
                if seen.insert(entry.name.to_lowercase()) {
                    entries.push(entry);
                }
            }
        }

        entries
    }

    /// Searches mounts in priority order
    fn read_file(&self, name: &str) -> MountResult<Vec<u8>> {
        let mounts = self.mounts.read();

        for mount in mounts.iter() {
            if mount.contains(name) {
                return mount.read_file(name);
            }
        }

        Err(MountError::PathNotFound { path: path::normalize_name(name) })
    }

    /// An exact match in any mount beats a prefix match in a higher one
    fn find_file(&self, pattern: &str) -> Option<PackageEntry> {
        let key = path::texture_key(pattern);
        let mounts = self.mounts.read();
        let mut first_prefix = None;

        for mount in mounts.iter() {
            if let Some(entry) = mount.find_file(pattern) {
                match path::match_texture(&key, &entry.name) {
                    Some(TextureMatch::Exact) => return Some(entry),
                    _ if first_prefix.is_none() => first_prefix = Some(entry),
                    _ => {}
                }
            }
        }

        first_prefix
    }

    fn contains(&self, name: &str) -> bool {
        self.mounts.read().iter().any(|m| m.contains(name))
    }

    fn file_count(&self) -> usize {
        self.entries().len()
    }
}
