//! Image encoders for decoded textures

use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use tempfile::NamedTempFile;
use texport_parsers::DecodedImage;

use crate::textures::TextureResult;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless, keeps alpha)
    Png,
    /// JPEG format (lossy, alpha dropped)
    Jpeg { quality: u8 },
}

impl ImageFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// PNG compression level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PngCompression {
    /// Encoder default
    #[default]
    Default,
    /// Larger files, quicker runs
    Fast,
    /// Smallest output
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(level: PngCompression) -> Self {
        match level {
            PngCompression::Default => CompressionType::Default,
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// Encode an image as PNG into any sink
pub fn encode_png<W: Write>(
    image: &DecodedImage,
    writer: W,
    compression: PngCompression,
) -> TextureResult<()> {
    let encoder = PngEncoder::new_with_quality(writer, compression.into(), FilterType::Adaptive);
    encoder.write_image(
        image.as_rgba(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Encode an image as baseline JPEG into any sink
pub fn encode_jpeg<W: Write>(image: &DecodedImage, mut writer: W, quality: u8) -> TextureResult<()> {
    let rgb: Vec<u8> = image
        .as_rgba()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder.encode(&rgb, image.width(), image.height(), ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Write a file through a sibling temporary file
///
/// `fill` streams the contents into a buffered writer. The temporary file
/// only replaces `output_path` once `fill` succeeds and the data is
/// flushed, so a failed write never leaves a partial file behind.
/// Returns the number of bytes written.
pub fn write_atomic<F>(output_path: impl AsRef<Path>, fill: F) -> TextureResult<u64>
where
    F: FnOnce(&mut dyn Write) -> TextureResult<()>,
{
    let output_path = output_path.as_ref();
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir)?;
    let mut writer = BufWriter::new(temp.as_file());
    fill(&mut writer)?;
    writer.into_inner().map_err(|e| e.into_error())?;

    let file = temp.persist(output_path).map_err(|e| e.error)?;
    Ok(file.metadata()?.len())
}

/// Encode an image to a file, streaming through a buffered writer
///
/// Returns the number of bytes written.
pub fn write_image(
    image: &DecodedImage,
    output_path: impl AsRef<Path>,
    format: ImageFormat,
    compression: PngCompression,
) -> TextureResult<u64> {
    write_atomic(output_path, |writer| match format {
        ImageFormat::Png => encode_png(image, writer, compression),
        ImageFormat::Jpeg { quality } => encode_jpeg(image, writer, quality),
    })
}
