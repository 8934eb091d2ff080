// texport-parsers/src/pk3/writer.rs
//! Minimal in-memory PK3 builder (stored and deflated entries)

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use super::compression::Pk3Compression;
use super::{CompressionMethod, CD_SIGNATURE, EOCD_SIGNATURE, LOCAL_HEADER_SIGNATURE};
use crate::traits::{ParseError, ParseResult};

/// ZIP version 2.0, the baseline for deflate
const VERSION: u16 = 20;

/// Builds a PK3 package in memory
#[derive(Debug, Default)]
pub struct Pk3Writer {
    data: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl Pk3Writer {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file entry
    pub fn add_file(
        &mut self,
        path: &str,
        contents: &[u8],
        method: CompressionMethod,
    ) -> ParseResult<&mut Self> {
        let compressed = Pk3Compression::compress(contents, method)?;
        let crc = Pk3Compression::crc32(contents);
        self.add_record(path, &compressed, contents.len(), crc, method)
    }

    /// Append a directory entry (`path` gets a trailing slash)
    pub fn add_directory(&mut self, path: &str) -> ParseResult<&mut Self> {
        let path = format!("{}/", path.trim_end_matches('/'));
        self.add_record(&path, &[], 0, 0, CompressionMethod::Store)
    }

    fn add_record(
        &mut self,
        path: &str,
        payload: &[u8],
        uncompressed_len: usize,
        crc: u32,
        method: CompressionMethod,
    ) -> ParseResult<&mut Self> {
        let too_big = |what: &str| ParseError::UnsupportedFeature(format!("{what} needs ZIP64: {path}"));

        let name_len = u16::try_from(path.len()).map_err(|_| too_big("name"))?;
        let compressed_len = u32::try_from(payload.len()).map_err(|_| too_big("entry"))?;
        let uncompressed_len = u32::try_from(uncompressed_len).map_err(|_| too_big("entry"))?;
        let offset = u32::try_from(self.data.len()).map_err(|_| too_big("archive"))?;
        self.count = self.count.checked_add(1).ok_or_else(|| too_big("entry count"))?;

        let local = &mut self.data;
        local.write_u32::<LittleEndian>(LOCAL_HEADER_SIGNATURE)?;
        local.write_u16::<LittleEndian>(VERSION)?;
        local.write_u16::<LittleEndian>(0)?; // flags
        local.write_u16::<LittleEndian>(method.code())?;
        local.write_u16::<LittleEndian>(0)?; // time
        local.write_u16::<LittleEndian>(0x21)?; // date: 1980-01-01
        local.write_u32::<LittleEndian>(crc)?;
        local.write_u32::<LittleEndian>(compressed_len)?;
        local.write_u32::<LittleEndian>(uncompressed_len)?;
        local.write_u16::<LittleEndian>(name_len)?;
        local.write_u16::<LittleEndian>(0)?; // extra
        local.write_all(path.as_bytes())?;
        local.write_all(payload)?;

        let cd = &mut self.central;
        cd.write_u32::<LittleEndian>(CD_SIGNATURE)?;
        cd.write_u16::<LittleEndian>(VERSION)?; // made by
        cd.write_u16::<LittleEndian>(VERSION)?; // needed
        cd.write_u16::<LittleEndian>(0)?;
        cd.write_u16::<LittleEndian>(method.code())?;
        cd.write_u16::<LittleEndian>(0)?;
        cd.write_u16::<LittleEndian>(0x21)?;
        cd.write_u32::<LittleEndian>(crc)?;
        cd.write_u32::<LittleEndian>(compressed_len)?;
        cd.write_u32::<LittleEndian>(uncompressed_len)?;
        cd.write_u16::<LittleEndian>(name_len)?;
        cd.write_u16::<LittleEndian>(0)?; // extra
        cd.write_u16::<LittleEndian>(0)?; // comment
        cd.write_u16::<LittleEndian>(0)?; // disk start
        cd.write_u16::<LittleEndian>(0)?; // internal attrs
        cd.write_u32::<LittleEndian>(0)?; // external attrs
        cd.write_u32::<LittleEndian>(offset)?;
        cd.write_all(path.as_bytes())?;

        Ok(self)
    }

    /// Finish the package and return its bytes
    pub fn finish(self) -> ParseResult<Vec<u8>> {
        let Self { mut data, central, count } = self;

        let cd_offset = u32::try_from(data.len())
            .map_err(|_| ParseError::UnsupportedFeature("archive needs ZIP64".to_string()))?;
        let cd_size = u32::try_from(central.len())
            .map_err(|_| ParseError::UnsupportedFeature("archive needs ZIP64".to_string()))?;

        data.extend_from_slice(&central);
        data.write_u32::<LittleEndian>(EOCD_SIGNATURE)?;
        data.write_u16::<LittleEndian>(0)?; // disk
        data.write_u16::<LittleEndian>(0)?; // cd disk
        data.write_u16::<LittleEndian>(count)?;
        data.write_u16::<LittleEndian>(count)?;
        data.write_u32::<LittleEndian>(cd_size)?;
        data.write_u32::<LittleEndian>(cd_offset)?;
        data.write_u16::<LittleEndian>(0)?; // comment

        Ok(data)
    }
}
