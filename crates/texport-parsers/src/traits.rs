// texport-parsers/src/traits.rs
//! Core traits defining the parser interface for all file formats.
//!
//! Every format in this crate is parsed through the same `Parser` trait so
//! callers can treat package indexes and texture decoders alike: hand over a
//! seekable reader (or a path) and get the parsed structure back.

use std::io::{Read, Seek};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Truncated data: needed {needed} bytes, available {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData { offset: u64, message: String },

    #[error("Checksum mismatch for {path}: expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch { path: String, expected: u32, actual: u32 },

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the input was well-formed but uses a variant we do not decode
    pub fn is_unsupported(&self) -> bool {
        match self {
            ParseError::UnsupportedFormat(_) | ParseError::UnsupportedFeature(_) => true,
            ParseError::Nested { source, .. } => source.is_unsupported(),
            _ => false,
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Configuration options for parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Verify CRC32 of extracted package entries
    pub verify_checksums: bool,
    /// Refuse to inflate entries larger than this (in bytes)
    pub max_entry_size: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            max_entry_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

/// Core trait for all file format parsers
///
/// Implementors of this trait provide the ability to parse a specific
/// file format found in game packages.
pub trait Parser: Send + Sync {
    /// The parsed output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["pk3"])
    fn extensions(&self) -> &[&str];

    /// Returns the magic bytes that identify this file type (if applicable)
    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Parse from a reader with default options
    fn parse<R: Read + Seek>(&self, reader: R) -> ParseResult<Self::Output> {
        self.parse_with_options(reader, &ParseOptions::default())
    }

    /// Parse from a reader with custom options
    fn parse_with_options<R: Read + Seek>(
        &self,
        reader: R,
        options: &ParseOptions,
    ) -> ParseResult<Self::Output>;

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        self.parse_file_with_options(path, &ParseOptions::default())
    }

    /// Parse from a file path with options
    fn parse_file_with_options(
        &self,
        path: &Path,
        options: &ParseOptions,
    ) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        self.parse_with_options(reader, options)
            .map_err(|e| e.with_context(path.display().to_string()))
    }

    /// Check if this parser can handle the given file
    fn can_parse(&self, path: &Path) -> bool {
        // Check extension
        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy();
            if self.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext_str)) {
                return true;
            }
        }

        // Try to check magic bytes if available
        if let Some(magic) = self.magic_bytes() {
            if let Ok(file) = std::fs::File::open(path) {
                let mut reader = std::io::BufReader::new(file);
                let mut buffer = vec![0u8; magic.len()];
                if reader.read_exact(&mut buffer).is_ok() {
                    return buffer == magic;
                }
            }
        }

        false
    }
}
