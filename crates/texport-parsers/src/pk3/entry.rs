// texport-parsers/src/pk3/entry.rs
//! PK3 package entry structures

use super::CompressionMethod;

/// Represents a single file entry in a PK3 package
#[derive(Debug, Clone)]
pub struct Pk3Entry {
    /// Full path within the package, forward slashes
    pub path: String,
    /// Compression method used
    pub compression: CompressionMethod,
    /// CRC32 checksum of uncompressed data
    pub crc32: u32,
    /// Size of compressed data
    pub compressed_size: u64,
    /// Size of uncompressed data
    pub uncompressed_size: u64,
    /// Offset to local file header
    pub local_header_offset: u64,
    /// General purpose bit flags
    pub flags: u16,
    /// Whether entry is encrypted
    pub is_encrypted: bool,
    /// Whether entry is a directory
    pub is_directory: bool,
}

/// Format byte count as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
