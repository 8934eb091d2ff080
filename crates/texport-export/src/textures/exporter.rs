//! Texture exporter

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use serde::Serialize;
use texport_parsers::tga;
use texport_vfs::{path, Package};

use crate::textures::encoder::{write_atomic, write_image, ImageFormat, PngCompression};
use crate::textures::{PathCache, TextureError, TextureResult};

/// Texture export options
#[derive(Debug, Clone)]
pub struct TextureExportOptions {
    /// Re-export textures already present under the output root
    pub overwrite: bool,

    /// PNG compression for decoded TGA textures
    pub png_compression: PngCompression,

    /// Quality for JPEG output (1-100)
    pub jpeg_quality: u8,
}

impl Default for TextureExportOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            png_compression: PngCompression::Default,
            jpeg_quality: 90,
        }
    }
}

/// Per-run export counters, one increment per texture reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// TGA textures decoded and written as PNG
    pub exported: usize,
    /// JPG textures copied verbatim
    pub passthrough: usize,
    /// References satisfied by an earlier export
    pub cached: usize,
    /// References that ended up `null`
    pub failed: usize,
    /// Stages pointed at the lightmap
    pub lightmaps: usize,
}

impl ExportSummary {
    /// References that resolved to a file
    pub fn resolved(&self) -> usize {
        self.exported + self.passthrough + self.cached
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exported, {} copied, {} cached, {} failed, {} lightmap stages",
            self.exported, self.passthrough, self.cached, self.failed, self.lightmaps
        )
    }
}

/// How a texture reference was satisfied
enum Outcome {
    Encoded(String),
    Copied(String),
    /// Output for the matched entry was already on disk
    Existing(String),
}

/// Exports textures from a package into an output directory
pub struct TextureExporter<'a, P: Package + ?Sized> {
    cache: PathCache,
    package: &'a P,
    options: TextureExportOptions,
    /// Results already produced this run, keyed by lowercased texture key
    resolved: HashMap<String, Option<String>>,
    summary: ExportSummary,
}

impl<'a, P: Package + ?Sized> TextureExporter<'a, P> {
    /// Create an exporter with default options
    pub fn new(output_root: impl Into<std::path::PathBuf>, package: &'a P) -> Self {
        Self::with_options(output_root, package, TextureExportOptions::default())
    }

    /// Create an exporter with custom options
    pub fn with_options(
        output_root: impl Into<std::path::PathBuf>,
        package: &'a P,
        options: TextureExportOptions,
    ) -> Self {
        Self {
            cache: PathCache::new(output_root),
            package,
            options,
            resolved: HashMap::new(),
            summary: ExportSummary::default(),
        }
    }

    /// Output root bookkeeping
    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Options this exporter was built with
    pub fn options(&self) -> &TextureExportOptions {
        &self.options
    }

    /// Counters so far
    pub fn summary(&self) -> ExportSummary {
        self.summary
    }

    pub(crate) fn summary_mut(&mut self) -> &mut ExportSummary {
        &mut self.summary
    }

    /// Export one texture reference
    ///
    /// Returns the exported name relative to the output root (with its new
    /// extension), or `None` when the texture cannot be exported. Failures
    /// are logged, never returned.
    pub fn export(&mut self, name: &str) -> Option<String> {
        let key = path::texture_key(name);
        if key.is_empty() {
            tracing::warn!(texture = name, "Empty texture name");
            self.summary.failed += 1;
            return None;
        }

        let memo_key = key.to_lowercase();
        if let Some(previous) = self.resolved.get(&memo_key) {
            match previous {
                Some(_) => self.summary.cached += 1,
                None => self.summary.failed += 1,
            }
            return previous.clone();
        }

        let result = self.export_uncached(name, &key);
        self.resolved.insert(memo_key, result.clone());
        result
    }

    fn export_uncached(&mut self, name: &str, key: &str) -> Option<String> {
        if !self.options.overwrite {
            if let Some(hit) = self.cache.cached(key) {
                tracing::debug!(texture = name, output = %hit, "Already exported");
                self.summary.cached += 1;
                return Some(hit);
            }
        }

        match self.export_entry(key) {
            Ok(Outcome::Encoded(output)) => {
                tracing::info!(texture = name, output = %output, "Exported texture");
                self.summary.exported += 1;
                Some(output)
            }
            Ok(Outcome::Copied(output)) => {
                tracing::info!(texture = name, output = %output, "Copied texture");
                self.summary.passthrough += 1;
                Some(output)
            }
            Ok(Outcome::Existing(output)) => {
                tracing::debug!(texture = name, output = %output, "Already exported");
                self.summary.cached += 1;
                Some(output)
            }
            Err(TextureError::NotFound(_)) => {
                tracing::warn!(texture = name, "Texture not found");
                self.summary.failed += 1;
                None
            }
            Err(TextureError::UnknownExtension(entry)) => {
                tracing::warn!(texture = name, entry = %entry, "Unknown texture type");
                self.summary.failed += 1;
                None
            }
            Err(TextureError::UnsafeName(entry)) => {
                tracing::warn!(texture = name, entry = %entry, "Refusing entry outside the output root");
                self.summary.failed += 1;
                None
            }
            Err(e) => {
                tracing::warn!(texture = name, error = %e, "Texture export failed");
                self.summary.failed += 1;
                None
            }
        }
    }

    fn export_entry(&self, key: &str) -> TextureResult<Outcome> {
        let entry = self
            .package
            .find_file(key)
            .ok_or_else(|| TextureError::NotFound(key.to_string()))?;

        let name = path::safe_relative_name(&entry.name)
            .ok_or_else(|| TextureError::UnsafeName(entry.name.clone()))?;

        let extension = entry.extension().map(str::to_ascii_lowercase);
        let (output, decode) = match extension.as_deref() {
            Some("jpg") => (name, false),
            Some("tga") => {
                let stem = path::strip_image_extension(&name);
                (format!("{stem}.{}", ImageFormat::Png.extension()), true)
            }
            _ => return Err(TextureError::UnknownExtension(entry.name)),
        };

        // The request may differ in case from the entry it matched
        let output_path = self.cache.full_path(&output);
        if !self.options.overwrite && self.cache.exists(&output_path) {
            return Ok(Outcome::Existing(output));
        }

        let data = self.package.read_file(&entry.name)?;
        if !decode {
            self.cache.ensure_parent_dirs(&output_path)?;
            write_atomic(&output_path, |writer| Ok(writer.write_all(&data)?))?;
            return Ok(Outcome::Copied(output));
        }

        let image = tga::decode(&data).map_err(|e| e.with_context(entry.name.clone()))?;
        if image.alpha_restored() {
            tracing::debug!(entry = %entry.name, "All-zero alpha replaced with opaque");
        }

        self.cache.ensure_parent_dirs(&output_path)?;
        write_image(&image, &output_path, ImageFormat::Png, self.options.png_compression)?;

        Ok(Outcome::Encoded(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use texport_vfs::{MountError, MountResult, PackageEntry};

    /// In-memory package counting reads
    struct CountingPackage {
        files: Vec<(String, Vec<u8>)>,
        reads: AtomicUsize,
    }

    impl CountingPackage {
        fn new(files: Vec<(&str, Vec<u8>)>) -> Self {
            Self {
                files: files.into_iter().map(|(n, d)| (n.to_string(), d)).collect(),
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl Package for CountingPackage {
        fn name(&self) -> &str {
            "memory"
        }

        fn entries(&self) -> Vec<PackageEntry> {
            self.files
                .iter()
                .map(|(name, data)| PackageEntry::new(name.clone(), data.len() as u64))
                .collect()
        }

        fn read_file(&self, name: &str) -> MountResult<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, d)| d.clone())
                .ok_or_else(|| MountError::PathNotFound { path: name.to_string() })
        }
    }

    fn tga(image_type: u8, width: u16, height: u16, bpp: u8, pixels: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 18];
        data[2] = image_type;
        data[12..14].copy_from_slice(&width.to_le_bytes());
        data[14..16].copy_from_slice(&height.to_le_bytes());
        data[16] = bpp;
        data.extend_from_slice(pixels);
        data
    }

    fn red_pixel() -> Vec<u8> {
        tga(2, 1, 1, 24, &[0, 0, 255])
    }

    #[test]
    fn test_tga_becomes_png() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", red_pixel())]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        let name = exporter.export("textures/base/wall").unwrap();
        assert_eq!(name, "textures/base/wall.png");

        let png = image::open(dir.path().join(&name)).unwrap().to_rgba8();
        assert_eq!(png.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(exporter.summary().exported, 1);
    }

    #[test]
    fn test_second_export_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", red_pixel())]);

        let mut exporter = TextureExporter::new(dir.path(), &package);
        let first = exporter.export("textures/base/wall");
        let second = exporter.export("textures/base/wall");
        assert_eq!(first, second);
        assert_eq!(package.reads(), 1);

        // A new run over the same output finds the file on disk
        let mut rerun = TextureExporter::new(dir.path(), &package);
        assert_eq!(rerun.export("textures/base/wall"), first);
        assert_eq!(package.reads(), 1);
        assert_eq!(rerun.summary().cached, 1);
    }

    #[test]
    fn test_overwrite_reexports_once_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", red_pixel())]);
        TextureExporter::new(dir.path(), &package).export("textures/base/wall");

        let options = TextureExportOptions { overwrite: true, ..Default::default() };
        let mut exporter = TextureExporter::with_options(dir.path(), &package, options);
        exporter.export("textures/base/wall");
        exporter.export("textures/base/wall");
        assert_eq!(package.reads(), 2);
    }

    #[test]
    fn test_jpg_passthrough_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 0xFF, 0xD9];
        let package = CountingPackage::new(vec![("textures/sky/clouds.jpg", jpeg.clone())]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        // Scripts often name the .tga while the package ships a .jpg
        let name = exporter.export("textures/sky/clouds.tga").unwrap();
        assert_eq!(name, "textures/sky/clouds.jpg");
        assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), jpeg);
        assert_eq!(exporter.summary().passthrough, 1);
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", red_pixel())]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        assert_eq!(exporter.export("textures/base/floor"), None);
        assert_eq!(exporter.export("textures/base/floor"), None);
        assert_eq!(exporter.export(""), None);
        assert_eq!(exporter.summary().failed, 3);
        assert_eq!(package.reads(), 0);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.pcx", vec![0; 4])]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        assert_eq!(exporter.export("textures/base/wall"), None);
        assert_eq!(package.reads(), 0);
    }

    #[test]
    fn test_undecodable_tga() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", tga(1, 1, 1, 24, &[0, 0, 0]))]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        assert_eq!(exporter.export("textures/base/wall"), None);
        assert!(!dir.path().join("textures/base/wall.png").exists());
        assert_eq!(exporter.summary().failed, 1);
    }

    #[test]
    fn test_prefix_match() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall_dark.tga", red_pixel())]);
        let mut exporter = TextureExporter::new(dir.path(), &package);

        assert_eq!(
            exporter.export("textures\\base\\wall").as_deref(),
            Some("textures/base/wall_dark.png")
        );
    }

    #[test]
    fn test_summary_display() {
        let summary = ExportSummary { exported: 2, passthrough: 1, cached: 3, failed: 0, lightmaps: 4 };
        assert_eq!(summary.resolved(), 6);
        assert_eq!(
            summary.to_string(),
            "2 exported, 1 copied, 3 cached, 0 failed, 4 lightmap stages"
        );
    }

    #[test]
    fn test_mixed_case_reference_reuses_output() {
        let dir = tempfile::tempdir().unwrap();
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xD9];
        let package = CountingPackage::new(vec![
            ("textures/base/wall.jpg", jpeg),
            ("textures/base/floor.tga", red_pixel()),
        ]);

        let mut first = TextureExporter::new(dir.path(), &package);
        assert_eq!(first.export("Textures/Base/Wall").as_deref(), Some("textures/base/wall.jpg"));
        assert_eq!(first.export("TEXTURES/BASE/FLOOR.TGA").as_deref(), Some("textures/base/floor.png"));
        assert_eq!(package.reads(), 2);

        let mut second = TextureExporter::new(dir.path(), &package);
        assert_eq!(second.export("Textures/Base/Wall").as_deref(), Some("textures/base/wall.jpg"));
        assert_eq!(second.export("TEXTURES/BASE/FLOOR.TGA").as_deref(), Some("textures/base/floor.png"));
        assert_eq!(package.reads(), 2);

        let summary = second.summary();
        assert_eq!(summary.cached, 2);
        assert_eq!(summary.passthrough + summary.exported, 0);
    }

    #[test]
    fn test_entry_escaping_root_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let package = CountingPackage::new(vec![
            ("textures/wall/../../../evil.jpg", b"PWNED".to_vec()),
            ("sfx\\..\\..\\evil.tga", red_pixel()),
        ]);
        let mut exporter = TextureExporter::new(&root, &package);

        assert_eq!(exporter.export("textures/wall"), None);
        assert_eq!(exporter.export("sfx"), None);
        assert_eq!(exporter.summary().failed, 2);
        assert_eq!(package.reads(), 0);

        assert!(!tmp.path().join("evil.jpg").exists());
        assert!(!tmp.path().join("evil.png").exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_failed_encode_is_not_cached_later() {
        let dir = tempfile::tempdir().unwrap();
        let package = CountingPackage::new(vec![("textures/base/wall.tga", red_pixel())]);

        // A directory where the PNG should go makes the final rename fail
        std::fs::create_dir_all(dir.path().join("textures/base/wall.png/x")).unwrap();
        let mut exporter = TextureExporter::new(dir.path(), &package);
        assert_eq!(exporter.export("textures/base/wall"), None);
        assert_eq!(std::fs::read_dir(dir.path().join("textures/base")).unwrap().count(), 1);

        std::fs::remove_dir_all(dir.path().join("textures/base/wall.png")).unwrap();
        let mut rerun = TextureExporter::new(dir.path(), &package);
        assert_eq!(rerun.export("textures/base/wall").as_deref(), Some("textures/base/wall.png"));
        assert_eq!(rerun.summary().exported, 1);
    }
}
