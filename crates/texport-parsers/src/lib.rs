//! texport-parsers
//!
//! Parsers for the file formats found in Quake 3 style game packages.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | PK3    | `.pk3`    | Game package (plain ZIP) |
//! | TGA    | `.tga`    | Uncompressed true-color Targa texture |
//!
//! # Example
//!
//! ```rust,ignore
//! use texport_parsers::{Pk3Parser, Parser};
//!
//! let archive = Pk3Parser::new().parse_file("baseq3/pak0.pk3".as_ref())?;
//! println!("Found {} entries", archive.entry_count());
//! ```

pub mod traits;
pub mod logging;
pub mod pk3;
pub mod tga;

// Re-export main types
pub use traits::{ParseError, ParseOptions, ParseResult, Parser};

pub use pk3::{CompressionMethod, Pk3Archive, Pk3Entry, Pk3Parser, Pk3Writer};
pub use tga::{DecodedImage, ImageType, TgaHeader, TgaParser};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
