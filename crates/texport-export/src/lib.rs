//! texport export pipeline
//!
//! Turns game-package textures into files a modern renderer can load:
//! - TGA textures decoded and re-encoded as PNG
//! - JPG textures copied byte for byte
//! - Material and shader documents rewritten to reference the results
//! - JSON output for the rewritten documents
//!
//! # Example
//! ```no_run
//! use texport_core::{MaterialData, ShaderTable};
//! use texport_export::export_textures;
//! use texport_vfs::VfsTree;
//!
//! let vfs = VfsTree::from_paths(&["baseq3"]).unwrap();
//! let mut shaders = ShaderTable::from_json_file("shaders.json").unwrap();
//! let mut materials = MaterialData::from_json_file("materials.json").unwrap();
//!
//! let summary = export_textures("out", &mut shaders, &mut materials, "maps/q3dm1/lm.png", &vfs);
//! println!("{summary}");
//! ```

pub mod json;
pub mod materials;
pub mod textures;

pub use json::{JsonError, JsonExportOptions, JsonExporter};
pub use materials::{export_textures, export_textures_with_options, MaterialRewriter};
pub use textures::{
    ExportSummary, ImageFormat, PathCache, PngCompression, TextureError, TextureExportOptions,
    TextureExporter,
};
