//! Texture export
//!
//! Resolves texture references against a package and writes them under an
//! output root: JPG entries are copied verbatim, TGA entries are decoded and
//! re-encoded as PNG.

mod cache;
mod encoder;
mod exporter;

pub use cache::PathCache;
pub use encoder::{encode_jpeg, encode_png, write_atomic, write_image, ImageFormat, PngCompression};
pub use exporter::{ExportSummary, TextureExportOptions, TextureExporter};

use texport_parsers::ParseError;
use texport_vfs::MountError;
use thiserror::Error;

/// Texture export errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decode error: {0}")]
    Parse(#[from] ParseError),

    #[error("Package error: {0}")]
    Mount(#[from] MountError),

    #[error("Texture not found: {0}")]
    NotFound(String),

    #[error("Unknown texture type: {0}")]
    UnknownExtension(String),

    #[error("Entry name leaves the output root: {0}")]
    UnsafeName(String),
}

pub type TextureResult<T> = Result<T, TextureError>;
