//! TGA (Truevision Targa) texture decoder
//!
//! Only uncompressed true-color images (type 2, 24 or 32 bits per pixel) are
//! decoded. Color-mapped, greyscale and RLE variants are rejected.
//!
//! # Pixel Layout
//! ```text
//! file:   [header 18][id N][row H-1][row H-2] ... [row 0]   (B,G,R[,A])
//! output: [row 0][row 1] ... [row H-1]                      (R,G,B,A)
//! ```

mod header;

pub use header::{ImageType, TgaHeader, HEADER_SIZE};

use std::io::{Read, Seek};

use crate::traits::{ParseError, ParseOptions, ParseResult, Parser};

/// A decoded texture: row-major, top-to-bottom, 8-bit RGBA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    alpha_restored: bool,
}

impl DecodedImage {
    /// Wrap an RGBA buffer; `None` unless `data.len() == width * height * 4`
    /// and both dimensions are non-zero.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;

        if width == 0 || height == 0 || data.len() != expected {
            return None;
        }

        Some(Self {
            width,
            height,
            data,
            alpha_restored: false,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA bytes
    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image, returning the RGBA bytes
    pub fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    /// Whether the all-zero alpha workaround was applied during decode
    pub fn alpha_restored(&self) -> bool {
        self.alpha_restored
    }

    /// RGBA value at (x, y), origin top-left
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Decode an uncompressed true-color TGA buffer
pub fn decode(data: &[u8]) -> ParseResult<DecodedImage> {
    let header = TgaHeader::parse(data)?;

    if header.width == 0 || header.height == 0 {
        return Err(ParseError::InvalidDimensions {
            width: u32::from(header.width),
            height: u32::from(header.height),
        });
    }

    if header.image_type != ImageType::TrueColor {
        return Err(ParseError::UnsupportedFormat(format!(
            "TGA image type {} ({:?})",
            header.image_type.code(),
            header.image_type
        )));
    }

    let bytes_per_pixel = match header.bits_per_pixel {
        24 | 32 => header.bytes_per_pixel(),
        other => {
            return Err(ParseError::UnsupportedFormat(format!(
                "TGA true-color depth of {other} bits"
            )))
        }
    };

    let start = header.pixel_offset();
    let needed = start + header.pixel_data_size();
    if data.len() < needed {
        return Err(ParseError::Truncated {
            needed,
            available: data.len(),
        });
    }

    let width = header.width as usize;
    let height = header.height as usize;
    let row_bytes = width * 4;

    let mut out = vec![0u8; row_bytes * height];
    let mut source = data[start..needed].chunks_exact(bytes_per_pixel);
    let mut any_alpha = false;

    // Stored rows run bottom-up
    for y in (0..height).rev() {
        let row = &mut out[y * row_bytes..(y + 1) * row_bytes];
        for (dst, src) in row.chunks_exact_mut(4).zip(source.by_ref()) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = if bytes_per_pixel == 4 { src[3] } else { 255 };
            any_alpha |= dst[3] != 0;
        }
    }

    // Workaround: some assets ship a meaningless all-zero alpha channel that
    // would encode as a fully transparent image. Not a TGA format rule.
    let alpha_restored = !any_alpha;
    if alpha_restored {
        for px in out.chunks_exact_mut(4) {
            px[3] = 255;
        }
    }

    Ok(DecodedImage {
        width: u32::from(header.width),
        height: u32::from(header.height),
        data: out,
        alpha_restored,
    })
}

/// TGA decoder exposed through the common `Parser` interface
#[derive(Debug, Default, Clone, Copy)]
pub struct TgaParser;

impl TgaParser {
    /// Create a new TGA parser
    pub fn new() -> Self {
        Self
    }

    /// Decode an in-memory TGA buffer
    pub fn decode(&self, data: &[u8]) -> ParseResult<DecodedImage> {
        decode(data)
    }
}

impl Parser for TgaParser {
    type Output = DecodedImage;

    fn extensions(&self) -> &[&str] {
        &["tga"]
    }

    fn name(&self) -> &str {
        "TGA Texture Decoder"
    }

    fn parse_with_options<R: Read + Seek>(
        &self,
        mut reader: R,
        _options: &ParseOptions,
    ) -> ParseResult<Self::Output> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        decode(&data)
    }
}
