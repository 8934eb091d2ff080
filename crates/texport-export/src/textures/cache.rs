//! Output directory bookkeeping

use std::io;
use std::path::{Path, PathBuf};

/// Extensions probed for an already exported texture, in order
const CACHED_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Tracks what already exists under an output root
#[derive(Debug, Clone)]
pub struct PathCache {
    root: PathBuf,
}

impl PathCache {
    /// Track the output tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output location for a package-relative name
    pub fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create every missing ancestor of `full_path`
    pub fn ensure_parent_dirs(&self, full_path: &Path) -> io::Result<()> {
        let Some(parent) = full_path.parent() else {
            return Ok(());
        };

        match std::fs::create_dir_all(parent) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && parent.is_dir() => Ok(()),
            result => result,
        }
    }

    /// Whether a regular file is already at `full_path`
    pub fn exists(&self, full_path: &Path) -> bool {
        full_path.is_file()
    }

    /// Name of a previous export of `name` (`<name>.jpg`, then `<name>.png`)
    pub fn cached(&self, name: &str) -> Option<String> {
        CACHED_EXTENSIONS
            .iter()
            .map(|ext| format!("{name}.{ext}"))
            .find(|candidate| self.exists(&self.full_path(candidate)))
    }
}
