//! TGA header structures

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::traits::{ParseError, ParseResult};

/// Size of the fixed TGA header in bytes
pub const HEADER_SIZE: usize = 18;

/// TGA image type (header byte 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// 0: header only, no pixel data
    NoImage,
    /// 1: palette indices
    ColorMapped,
    /// 2: uncompressed BGR/BGRA, the only type decoded
    TrueColor,
    /// 3: uncompressed single channel
    Greyscale,
    /// 9: run-length encoded palette indices
    RleColorMapped,
    /// 10: run-length encoded BGR/BGRA
    RleTrueColor,
    /// 11: run-length encoded single channel
    RleGreyscale,
    /// Any other type byte
    Unknown(u8),
}

impl From<u8> for ImageType {
    fn from(value: u8) -> Self {
        match value {
            0 => ImageType::NoImage,
            1 => ImageType::ColorMapped,
            2 => ImageType::TrueColor,
            3 => ImageType::Greyscale,
            9 => ImageType::RleColorMapped,
            10 => ImageType::RleTrueColor,
            11 => ImageType::RleGreyscale,
            other => ImageType::Unknown(other),
        }
    }
}

impl ImageType {
    /// Raw header value
    pub fn code(self) -> u8 {
        match self {
            ImageType::NoImage => 0,
            ImageType::ColorMapped => 1,
            ImageType::TrueColor => 2,
            ImageType::Greyscale => 3,
            ImageType::RleColorMapped => 9,
            ImageType::RleTrueColor => 10,
            ImageType::RleGreyscale => 11,
            ImageType::Unknown(code) => code,
        }
    }
}

/// TGA file header (18 bytes)
#[derive(Debug, Clone)]
pub struct TgaHeader {
    /// Length of the image ID field following the header
    pub id_length: u8,
    pub color_map_type: u8,
    pub image_type: ImageType,
    pub color_map_first: u16,
    pub color_map_length: u16,
    pub color_map_depth: u8,
    pub x_origin: u16,
    pub y_origin: u16,
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    /// Alpha depth and origin bits; parsed, not interpreted
    pub descriptor: u8,
}

impl TgaHeader {
    /// Parse the fixed header from the start of a TGA buffer
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ParseError::Truncated {
                needed: HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(&data[..HEADER_SIZE]);

        Ok(TgaHeader {
            id_length: cursor.read_u8()?,
            color_map_type: cursor.read_u8()?,
            image_type: ImageType::from(cursor.read_u8()?),
            color_map_first: cursor.read_u16::<LittleEndian>()?,
            color_map_length: cursor.read_u16::<LittleEndian>()?,
            color_map_depth: cursor.read_u8()?,
            x_origin: cursor.read_u16::<LittleEndian>()?,
            y_origin: cursor.read_u16::<LittleEndian>()?,
            width: cursor.read_u16::<LittleEndian>()?,
            height: cursor.read_u16::<LittleEndian>()?,
            bits_per_pixel: cursor.read_u8()?,
            descriptor: cursor.read_u8()?,
        })
    }

    /// Offset of the first pixel byte
    pub fn pixel_offset(&self) -> usize {
        HEADER_SIZE + self.id_length as usize
    }

    /// Bytes per stored pixel
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    /// Size of the stored pixel block in bytes
    pub fn pixel_data_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}
