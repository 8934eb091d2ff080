//! Material and shader rewriting
//!
//! Walks the materials of a level, exports every texture their shaders
//! reference, and replaces each reference with the exported file name.

use std::collections::HashSet;
use std::path::PathBuf;

use texport_core::{MaterialData, Shader, ShaderTable, StageMap};
use texport_vfs::Package;

use crate::textures::{ExportSummary, TextureExportOptions, TextureExporter};

/// Rewrites texture references in place while exporting them
pub struct MaterialRewriter<'a, P: Package + ?Sized> {
    exporter: TextureExporter<'a, P>,
    /// Shaders already rewritten this run
    visited: HashSet<String>,
}

impl<'a, P: Package + ?Sized> MaterialRewriter<'a, P> {
    /// Wrap an exporter; its options and output root apply to every stage
    pub fn new(exporter: TextureExporter<'a, P>) -> Self {
        Self {
            exporter,
            visited: HashSet::new(),
        }
    }

    /// Rewrite every material and the shaders they use
    ///
    /// For a material whose shader exists, each stage is rewritten: literal
    /// maps and `anim` frames become exported names (or `null`), and
    /// `$lightmap` becomes `lightmap_path`. A shared shader is rewritten once.
    /// A material without a shader has its `shaderName` exported as a texture
    /// and replaced by the result.
    pub fn rewrite_all(
        &mut self,
        shaders: &mut ShaderTable,
        data: &mut MaterialData,
        lightmap_path: &str,
    ) -> ExportSummary {
        for material in &mut data.materials {
            let Some(shader_name) = material.shader_name.clone() else {
                continue;
            };

            match shaders.get_mut(&shader_name) {
                Some(shader) => {
                    if self.visited.insert(shader_name.clone()) {
                        tracing::debug!(shader = %shader_name, stages = shader.stages.len(), "Rewriting shader");
                        self.rewrite_shader(shader, lightmap_path);
                    }
                }
                None => {
                    tracing::debug!(shader = %shader_name, "No shader, exporting name as texture");
                    material.shader_name = self.exporter.export(&shader_name);
                }
            }
        }

        self.exporter.summary()
    }

    /// Rewrite one shader's stages in order
    pub fn rewrite_shader(&mut self, shader: &mut Shader, lightmap_path: &str) {
        for stage in &mut shader.stages {
            match stage.map_kind() {
                StageMap::Anim => {
                    for frame in &mut stage.anim_maps {
                        if let Some(name) = frame.take() {
                            *frame = self.exporter.export(&name);
                        }
                    }
                }
                StageMap::Lightmap => {
                    stage.map = Some(lightmap_path.to_string());
                    self.exporter.summary_mut().lightmaps += 1;
                }
                StageMap::Texture(name) => {
                    let name = name.to_string();
                    stage.map = self.exporter.export(&name);
                }
                StageMap::Unset => {}
            }
        }
    }

    /// Counters so far
    pub fn summary(&self) -> ExportSummary {
        self.exporter.summary()
    }
}

/// Export every texture referenced by `data` from `package` into
/// `output_folder`, rewriting `shaders` and `data` to point at the results.
pub fn export_textures<P: Package + ?Sized>(
    output_folder: impl Into<PathBuf>,
    shaders: &mut ShaderTable,
    data: &mut MaterialData,
    lightmap_path: &str,
    package: &P,
) -> ExportSummary {
    export_textures_with_options(
        output_folder,
        shaders,
        data,
        lightmap_path,
        package,
        TextureExportOptions::default(),
    )
}

/// `export_textures` with custom options
pub fn export_textures_with_options<P: Package + ?Sized>(
    output_folder: impl Into<PathBuf>,
    shaders: &mut ShaderTable,
    data: &mut MaterialData,
    lightmap_path: &str,
    package: &P,
    options: TextureExportOptions,
) -> ExportSummary {
    let exporter = TextureExporter::with_options(output_folder, package, options);
    let summary = MaterialRewriter::new(exporter).rewrite_all(shaders, data, lightmap_path);

    tracing::info!(
        materials = data.materials.len(),
        resolved = summary.resolved(),
        failed = summary.failed,
        "Texture export finished"
    );

    summary
}
