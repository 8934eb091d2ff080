//! JSON output for rewritten documents
//!
//! Writes material and shader documents back out after rewriting, and
//! package listings for inspection.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::json;
use texport_core::{MaterialData, ShaderTable};
use texport_vfs::Package;
use thiserror::Error;

use crate::textures::ExportSummary;

/// JSON export errors
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type JsonResult<T> = Result<T, JsonError>;

/// JSON export options
#[derive(Debug, Clone)]
pub struct JsonExportOptions {
    /// Use pretty-print formatting
    pub pretty: bool,

    /// Wrap listings with a metadata block (counts, package name)
    pub include_metadata: bool,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_metadata: true,
        }
    }
}

/// JSON document writer
pub struct JsonExporter {
    options: JsonExportOptions,
}

impl JsonExporter {
    /// Create new exporter with default options
    pub fn new() -> Self {
        Self {
            options: JsonExportOptions::default(),
        }
    }

    /// Create exporter with custom options
    pub fn with_options(options: JsonExportOptions) -> Self {
        Self { options }
    }

    /// Write the material document, unknown fields included
    pub fn export_materials(&self, data: &MaterialData, output_path: impl AsRef<Path>) -> JsonResult<()> {
        self.write_file(data, output_path)
    }

    /// Write the shader table
    pub fn export_shaders(&self, shaders: &ShaderTable, output_path: impl AsRef<Path>) -> JsonResult<()> {
        self.write_file(shaders, output_path)
    }

    /// Write a package listing with sizes
    pub fn export_package_index<P: Package + ?Sized>(
        &self,
        package: &P,
        output_path: impl AsRef<Path>,
    ) -> JsonResult<()> {
        let entries: Vec<_> = package
            .entries()
            .into_iter()
            .map(|e| json!({ "name": e.name, "size": e.size }))
            .collect();

        let output = if self.options.include_metadata {
            json!({
                "metadata": {
                    "package": package.name(),
                    "file_count": entries.len(),
                    "total_size": package.entries().iter().map(|e| e.size).sum::<u64>(),
                },
                "entries": entries,
            })
        } else {
            json!(entries)
        };

        self.write_file(&output, output_path)
    }

    /// Serialize an export summary
    pub fn summary_to_string(&self, summary: &ExportSummary) -> JsonResult<String> {
        let mut buffer = Vec::new();
        self.write_json(summary, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write JSON to file
    fn write_file<T: Serialize + ?Sized>(&self, value: &T, output_path: impl AsRef<Path>) -> JsonResult<()> {
        let output_path = output_path.as_ref();
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(output_path)?);
        self.write_json(value, &mut writer)?;
        writer.flush()?;

        Ok(())
    }

    fn write_json<T: Serialize + ?Sized, W: Write>(&self, value: &T, writer: W) -> JsonResult<()> {
        if self.options.pretty {
            serde_json::to_writer_pretty(writer, value)?;
        } else {
            serde_json::to_writer(writer, value)?;
        }

        Ok(())
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}
