//! texport Virtual File System
//!
//! Provides a unified, read-only view over game packages:
//! - PK3 archives, on disk or in memory
//! - Local filesystem directories
//! - Overlays of both, where later and higher-priority mounts win
//!
//! # Example
//! ```no_run
//! use texport_vfs::{Package, VfsTree};
//!
//! let vfs = VfsTree::from_paths(&["baseq3"]).unwrap();
//!
//! // Resolve a texture reference the way shaders spell it
//! if let Some(entry) = vfs.find_file("textures/base_wall/metal") {
//!     let data = vfs.read_file(&entry.name).unwrap();
//!     println!("{} is {} bytes", entry.name, data.len());
//! }
//! ```

pub mod entry;
pub mod mount;
pub mod path;
pub mod tree;

pub use entry::PackageEntry;
pub use mount::{FilesystemMount, MountError, MountResult, Package, Pk3Mount};
pub use path::TextureMatch;
pub use tree::VfsTree;
