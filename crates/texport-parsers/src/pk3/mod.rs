// texport-parsers/src/pk3/mod.rs
//! PK3 Package Parser
//!
//! A PK3 is a plain ZIP file. Only the parts of the format produced by
//! common packers are handled: stored and deflated entries, a single disk,
//! no ZIP64 and no encryption.
//!
//! # Format Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Local header + file data  (one per entry)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Central directory          (one record per entry)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  End of central directory   (0x06054B50, offset, count)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod archive;
mod entry;
mod compression;
mod writer;

pub use archive::Pk3Archive;
pub use entry::{format_bytes, Pk3Entry};
pub use compression::Pk3Compression;
pub use writer::Pk3Writer;

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::traits::{ParseError, ParseOptions, ParseResult, Parser};

/// Magic bytes for ZIP-based packages
const PK3_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04]; // "PK\x03\x04"

/// End of central directory signature
const EOCD_SIGNATURE: u32 = 0x0605_4B50;

/// Central directory file header signature
const CD_SIGNATURE: u32 = 0x0201_4B50;

/// Local file header signature
const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;

/// Fixed part of the end of central directory record
const EOCD_SIZE: u64 = 22;

/// Compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// 0: stored as-is
    Store,
    /// 8: raw DEFLATE stream
    Deflate,
    /// Any other method code
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Store,
            8 => CompressionMethod::Deflate,
            other => CompressionMethod::Unknown(other),
        }
    }
}

impl CompressionMethod {
    /// Raw ZIP method id
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(code) => code,
        }
    }
}

/// PK3 Package Parser
///
/// Reads the central directory of a package into a `Pk3Archive` index.
/// Entry data is read separately via `Pk3Archive::read_entry`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pk3Parser;

impl Pk3Parser {
    /// Create a new PK3 parser
    pub fn new() -> Self {
        Self
    }

    /// Locate and parse the end of central directory record
    fn parse_eocd<R: Read + Seek>(&self, reader: &mut R) -> ParseResult<EndOfCentralDirectory> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        if file_size < EOCD_SIZE {
            return Err(ParseError::Truncated {
                needed: EOCD_SIZE as usize,
                available: file_size as usize,
            });
        }

        // EOCD sits at the end, possibly followed by a comment of up to 64 KiB
        let search_start = file_size.saturating_sub(65535 + EOCD_SIZE);
        reader.seek(SeekFrom::Start(search_start))?;

        let mut buffer = vec![0u8; (file_size - search_start) as usize];
        reader.read_exact(&mut buffer)?;

        let sig_bytes = EOCD_SIGNATURE.to_le_bytes();
        let eocd_offset = buffer
            .windows(4)
            .rposition(|w| w == sig_bytes)
            .ok_or_else(|| ParseError::InvalidMagic {
                expected: sig_bytes.to_vec(),
                found: vec![],
            })?;

        let eocd_abs_offset = search_start + eocd_offset as u64;
        reader.seek(SeekFrom::Start(eocd_abs_offset + 4))?;

        let disk_number = reader.read_u16::<LittleEndian>()?;
        let cd_disk = reader.read_u16::<LittleEndian>()?;
        let _disk_entries = reader.read_u16::<LittleEndian>()?;
        let total_entries = reader.read_u16::<LittleEndian>()?;
        let cd_size = reader.read_u32::<LittleEndian>()?;
        let cd_offset = reader.read_u32::<LittleEndian>()?;

        if disk_number != cd_disk {
            return Err(ParseError::UnsupportedFeature("multi-disk archive".to_string()));
        }

        if cd_offset == 0xFFFF_FFFF || total_entries == 0xFFFF {
            return Err(ParseError::UnsupportedFeature("ZIP64 archive".to_string()));
        }

        if u64::from(cd_offset) + u64::from(cd_size) > eocd_abs_offset {
            return Err(ParseError::CorruptedData {
                offset: eocd_abs_offset,
                message: format!("central directory at {cd_offset} (+{cd_size}) overlaps EOCD"),
            });
        }

        Ok(EndOfCentralDirectory {
            total_entries: u64::from(total_entries),
            cd_offset: u64::from(cd_offset),
        })
    }

    /// Parse central directory entries
    fn parse_central_directory<R: Read + Seek>(
        &self,
        reader: &mut R,
        eocd: &EndOfCentralDirectory,
    ) -> ParseResult<Vec<Pk3Entry>> {
        reader.seek(SeekFrom::Start(eocd.cd_offset))?;

        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            entries.push(self.parse_cd_entry(reader)?);
        }

        Ok(entries)
    }

    /// Parse a single central directory entry
    fn parse_cd_entry<R: Read + Seek>(&self, reader: &mut R) -> ParseResult<Pk3Entry> {
        let offset = reader.stream_position()?;

        let sig = reader.read_u32::<LittleEndian>()?;
        if sig != CD_SIGNATURE {
            return Err(ParseError::InvalidMagic {
                expected: CD_SIGNATURE.to_le_bytes().to_vec(),
                found: sig.to_le_bytes().to_vec(),
            });
        }

        let _version_made = reader.read_u16::<LittleEndian>()?;
        let _version_needed = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let compression = CompressionMethod::from(reader.read_u16::<LittleEndian>()?);
        let _mod_time = reader.read_u16::<LittleEndian>()?;
        let _mod_date = reader.read_u16::<LittleEndian>()?;
        let crc32 = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        let name_length = reader.read_u16::<LittleEndian>()?;
        let extra_length = reader.read_u16::<LittleEndian>()?;
        let comment_length = reader.read_u16::<LittleEndian>()?;
        let _disk_start = reader.read_u16::<LittleEndian>()?;
        let _internal_attrs = reader.read_u16::<LittleEndian>()?;
        let _external_attrs = reader.read_u32::<LittleEndian>()?;
        let local_header_offset = reader.read_u32::<LittleEndian>()?;

        let mut name_bytes = vec![0u8; name_length as usize];
        reader.read_exact(&mut name_bytes)?;

        if name_bytes.is_empty() {
            return Err(ParseError::CorruptedData {
                offset,
                message: "entry with empty name".to_string(),
            });
        }

        // Some Windows packers store backslashes
        let raw = String::from_utf8_lossy(&name_bytes).replace('\\', "/");
        let is_directory = raw.ends_with('/');

        let mut path = normalize_entry_path(&raw);
        if path.is_empty() {
            return Err(ParseError::CorruptedData {
                offset,
                message: format!("entry name {raw:?} resolves to nothing"),
            });
        }
        if is_directory {
            path.push('/');
        }

        reader.seek(SeekFrom::Current(i64::from(extra_length) + i64::from(comment_length)))?;

        Ok(Pk3Entry {
            path,
            compression,
            crc32,
            compressed_size: u64::from(compressed_size),
            uncompressed_size: u64::from(uncompressed_size),
            local_header_offset: u64::from(local_header_offset),
            flags,
            is_encrypted: flags & 0x01 != 0,
            is_directory,
        })
    }
}

impl Parser for Pk3Parser {
    type Output = Pk3Archive;

    fn extensions(&self) -> &[&str] {
        &["pk3", "zip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(PK3_MAGIC)
    }

    fn name(&self) -> &str {
        "PK3 Package Parser"
    }

    fn parse_with_options<R: Read + Seek>(
        &self,
        mut reader: R,
        _options: &ParseOptions,
    ) -> ParseResult<Self::Output> {
        let eocd = self.parse_eocd(&mut reader)?;

        // An empty archive is only the EOCD record, no local header magic
        if eocd.total_entries > 0 {
            reader.seek(SeekFrom::Start(0))?;
            let mut magic = [0u8; 4];
            reader.read_exact(&mut magic)?;

            if magic != PK3_MAGIC {
                return Err(ParseError::InvalidMagic {
                    expected: PK3_MAGIC.to_vec(),
                    found: magic.to_vec(),
                });
            }
        }

        let entries = self.parse_central_directory(&mut reader, &eocd)?;
        tracing::debug!(entries = entries.len(), "Indexed package");

        Ok(Pk3Archive::from_entries(entries))
    }
}

/// Resolve `.` and `..` components of an entry name and drop empty ones.
/// A `..` at the top level is discarded, so the result never leaves the
/// package root.
fn normalize_entry_path(name: &str) -> String {
    let mut components = Vec::new();
    for component in name.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }
    components.join("/")
}

/// End of Central Directory record (the fields this parser uses)
#[derive(Debug)]
struct EndOfCentralDirectory {
    total_entries: u64,
    cd_offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_compression_method_conversion() {
        assert_eq!(CompressionMethod::from(0), CompressionMethod::Store);
        assert_eq!(CompressionMethod::from(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from(93), CompressionMethod::Unknown(93));
        assert_eq!(CompressionMethod::Deflate.code(), 8);
    }

    #[test]
    fn test_rejects_non_zip() {
        let err = Pk3Parser::new().parse(Cursor::new(vec![0u8; 64])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidMagic { .. }));
    }

    #[test]
    fn test_rejects_tiny_input() {
        let err = Pk3Parser::new().parse(Cursor::new(vec![0u8; 4])).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { .. }));
    }

    #[test]
    fn test_empty_archive() {
        let bytes = Pk3Writer::new().finish().unwrap();
        let archive = Pk3Parser::new().parse(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.entry_count(), 0);
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(normalize_entry_path("textures/base/wall.tga"), "textures/base/wall.tga");
        assert_eq!(normalize_entry_path("/textures//./base/wall.tga"), "textures/base/wall.tga");
        assert_eq!(normalize_entry_path("textures/wall/../../../evil.jpg"), "evil.jpg");
        assert_eq!(normalize_entry_path("../"), "");
    }

    #[test]
    fn test_index_resolves_parent_components() {
        let mut writer = Pk3Writer::new();
        writer
            .add_file("evil.jpg", b"first", CompressionMethod::Store)
            .unwrap()
            .add_file("textures/wall/../../../evil.jpg", b"second", CompressionMethod::Store)
            .unwrap()
            .add_file("textures\\base\\floor.tga", b"floor", CompressionMethod::Store)
            .unwrap();
        let archive = Pk3Parser::new().parse(Cursor::new(writer.finish().unwrap())).unwrap();

        let paths: Vec<_> = archive.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["evil.jpg", "evil.jpg", "textures/base/floor.tga"]);
        assert_eq!(archive.get("evil.jpg").unwrap().uncompressed_size, 5);
        assert!(archive.entries.iter().all(|e| !e.path.contains("..")));
    }
}
