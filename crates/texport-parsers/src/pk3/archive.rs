// texport-parsers/src/pk3/archive.rs
//! PK3 package container structure

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::compression::Pk3Compression;
use super::entry::Pk3Entry;
use super::LOCAL_HEADER_SIGNATURE;
use crate::traits::{ParseError, ParseOptions, ParseResult};

/// Parsed PK3 package index
#[derive(Debug, Default)]
pub struct Pk3Archive {
    /// All entries in central directory order
    pub entries: Vec<Pk3Entry>,
    /// Lowercased path to entry index
    pub path_index: HashMap<String, usize>,
}

impl Pk3Archive {
    /// Build an archive index from entries
    pub fn from_entries(entries: Vec<Pk3Entry>) -> Self {
        let mut path_index = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            // First occurrence wins on duplicate names
            path_index.entry(entry.path.to_lowercase()).or_insert(idx);
        }

        Self { entries, path_index }
    }

    /// Get total number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get number of files (non-directories)
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory).count()
    }

    /// Iterate file entries (directories skipped)
    pub fn files(&self) -> impl Iterator<Item = &Pk3Entry> {
        self.entries.iter().filter(|e| !e.is_directory)
    }

    /// Get an entry by path, ignoring case
    pub fn get(&self, path: &str) -> Option<&Pk3Entry> {
        self.path_index
            .get(&path.to_lowercase())
            .map(|idx| &self.entries[*idx])
    }

    /// Check if path exists in package, ignoring case
    pub fn contains(&self, path: &str) -> bool {
        self.path_index.contains_key(&path.to_lowercase())
    }

    /// Read and decompress one entry's data from the package stream
    pub fn read_entry<R: Read + Seek>(
        &self,
        reader: &mut R,
        entry: &Pk3Entry,
        options: &ParseOptions,
    ) -> ParseResult<Vec<u8>> {
        if entry.is_directory {
            return Err(ParseError::EntryNotFound(format!("{} is a directory", entry.path)));
        }

        if entry.is_encrypted {
            return Err(ParseError::UnsupportedFeature(format!(
                "encrypted entry {}",
                entry.path
            )));
        }

        if entry.uncompressed_size > options.max_entry_size {
            return Err(ParseError::UnsupportedFeature(format!(
                "entry {} is {} bytes (limit {})",
                entry.path, entry.uncompressed_size, options.max_entry_size
            )));
        }

        if entry.compressed_size > options.max_entry_size {
            return Err(ParseError::UnsupportedFeature(format!(
                "entry {} stores {} compressed bytes (limit {})",
                entry.path, entry.compressed_size, options.max_entry_size
            )));
        }

        reader.seek(SeekFrom::Start(entry.local_header_offset))?;

        let sig = reader.read_u32::<LittleEndian>()?;
        if sig != LOCAL_HEADER_SIGNATURE {
            return Err(ParseError::InvalidMagic {
                expected: LOCAL_HEADER_SIGNATURE.to_le_bytes().to_vec(),
                found: sig.to_le_bytes().to_vec(),
            });
        }

        // Skip version, flags, method, time, date, crc, sizes (22 bytes)
        reader.seek(SeekFrom::Current(22))?;
        let name_len = reader.read_u16::<LittleEndian>()?;
        let extra_len = reader.read_u16::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(i64::from(name_len) + i64::from(extra_len)))?;

        let compressed_len = usize::try_from(entry.compressed_size).map_err(|_| {
            ParseError::CorruptedData {
                offset: entry.local_header_offset,
                message: format!("compressed size {} overflows", entry.compressed_size),
            }
        })?;

        let mut compressed = vec![0u8; compressed_len];
        reader.read_exact(&mut compressed)?;

        let data = Pk3Compression::decompress(
            &compressed,
            entry.compression,
            entry.uncompressed_size as usize,
        )
        .map_err(|e| e.with_context(entry.path.clone()))?;

        if options.verify_checksums && !Pk3Compression::verify_crc32(&data, entry.crc32) {
            return Err(ParseError::ChecksumMismatch {
                path: entry.path.clone(),
                expected: entry.crc32,
                actual: Pk3Compression::crc32(&data),
            });
        }

        Ok(data)
    }
}
