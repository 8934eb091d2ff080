//! Package entry description

use crate::path;

/// A file found in a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Package-relative name, forward-slash separated
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

impl PackageEntry {
    /// Create a new entry
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size }
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        path::get_extension(&self.name)
    }

    /// Check if file has a specific extension (case-insensitive)
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension()
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false)
    }

    /// Get the filename component of the name
    pub fn filename(&self) -> &str {
        path::filename(&self.name)
    }
}
