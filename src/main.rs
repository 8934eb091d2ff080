//! texport CLI
//!
//! Exports the textures referenced by a level's materials from Quake 3 style
//! packages, and inspects packages and individual TGA files.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use texport_core::{MaterialData, ShaderTable};
use texport_export::textures::write_image;
use texport_export::{
    export_textures_with_options, ImageFormat, JsonExportOptions, JsonExporter, PngCompression,
    TextureExportOptions,
};
use texport_parsers::logging::{self, TracingConfig};
use texport_parsers::pk3::format_bytes;
use texport_parsers::{Parser as _, TgaParser};
use texport_vfs::{Package, VfsTree};

/// texport - convert game package textures to PNG/JPG and rewrite material references
#[derive(Parser)]
#[command(name = "texport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for listings and summaries
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    Default,
    Fast,
    Best,
}

impl From<CompressionArg> for PngCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Default => PngCompression::Default,
            CompressionArg::Fast => PngCompression::Fast,
            CompressionArg::Best => PngCompression::Best,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export referenced textures and rewrite the material documents
    Export(ExportArgs),

    /// List package contents
    List(ListArgs),

    /// Convert a single TGA file to PNG or JPG
    Decode(DecodeArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// PK3 file or game directory (can be repeated; later ones override)
    #[arg(short, long = "package", required = true)]
    packages: Vec<PathBuf>,

    /// Shader table JSON
    #[arg(long)]
    shaders: PathBuf,

    /// Material document JSON
    #[arg(long)]
    materials: PathBuf,

    /// Path written into every `$lightmap` stage
    #[arg(long)]
    lightmap: String,

    /// Output directory for textures
    #[arg(short, long)]
    output: PathBuf,

    /// Where to write the rewritten materials (default: <output>/materials.json)
    #[arg(long)]
    out_materials: Option<PathBuf>,

    /// Where to write the rewritten shaders (default: <output>/shaders.json)
    #[arg(long)]
    out_shaders: Option<PathBuf>,

    /// Re-export textures that already exist in the output directory
    #[arg(long)]
    overwrite: bool,

    /// PNG compression level
    #[arg(long, value_enum, default_value_t = CompressionArg::Default)]
    png_compression: CompressionArg,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
struct ListArgs {
    /// PK3 file or game directory (can be repeated)
    #[arg(short, long = "package", required = true)]
    packages: Vec<PathBuf>,

    /// Filter by path pattern (glob-style)
    pattern: Option<String>,

    /// Also write the listing to a JSON index file
    #[arg(long)]
    index: Option<PathBuf>,
}

#[derive(Args)]
struct DecodeArgs {
    /// TGA file to convert
    input: PathBuf,

    /// Output file (default: input with .png or .jpg extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write JPEG instead of PNG
    #[arg(long)]
    jpeg: bool,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::List(args) => cmd_list(args, cli.format),
        Commands::Decode(args) => cmd_decode(args),
    }
}

fn open_packages(paths: &[PathBuf]) -> Result<VfsTree> {
    VfsTree::from_paths(paths).with_context(|| format!("Failed to mount packages {paths:?}"))
}

fn load_document<T>(loaded: texport_core::Result<T>, kind: &str, path: &Path) -> Result<T> {
    loaded.map_err(|e| {
        if e.is_not_found() {
            anyhow!("No {kind} document at {}", path.display())
        } else {
            anyhow::Error::new(e).context(format!("Failed to load {kind} document {}", path.display()))
        }
    })
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let vfs = open_packages(&args.packages)?;

    let mut shaders = load_document(ShaderTable::from_json_file(&args.shaders), "shader", &args.shaders)?;
    let mut materials = load_document(MaterialData::from_json_file(&args.materials), "material", &args.materials)?;

    info!(
        shaders = shaders.len(),
        materials = materials.materials.len(),
        output = %args.output.display(),
        "Exporting textures"
    );

    let options = TextureExportOptions {
        overwrite: args.overwrite,
        png_compression: args.png_compression.into(),
        ..TextureExportOptions::default()
    };
    let summary = export_textures_with_options(
        &args.output,
        &mut shaders,
        &mut materials,
        &args.lightmap,
        &vfs,
        options,
    );

    let json = JsonExporter::with_options(JsonExportOptions {
        pretty: !args.compact,
        ..JsonExportOptions::default()
    });

    let out_materials = args.out_materials.unwrap_or_else(|| args.output.join("materials.json"));
    json.export_materials(&materials, &out_materials)
        .with_context(|| format!("Failed to write {}", out_materials.display()))?;

    let out_shaders = args.out_shaders.unwrap_or_else(|| args.output.join("shaders.json"));
    json.export_shaders(&shaders, &out_shaders)
        .with_context(|| format!("Failed to write {}", out_shaders.display()))?;

    match format {
        OutputFormat::Json => println!("{}", json.summary_to_string(&summary)?),
        OutputFormat::Text => {
            println!("{summary}");
            println!("Materials: {}", out_materials.display());
            println!("Shaders:   {}", out_shaders.display());
        }
    }

    Ok(())
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> Result<()> {
    let vfs = open_packages(&args.packages)?;

    let mut entries = match &args.pattern {
        Some(pattern) => vfs.find(pattern),
        None => vfs.entries(),
    };
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(index) = &args.index {
        JsonExporter::new()
            .export_package_index(&vfs, index)
            .with_context(|| format!("Failed to write {}", index.display()))?;
    }

    match format {
        OutputFormat::Json => {
            let json_entries: Vec<_> = entries
                .iter()
                .map(|e| serde_json::json!({ "name": e.name, "size": e.size }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json_entries)?);
        }
        OutputFormat::Text => {
            println!("{:<12} Name", "Size");
            println!("{:-<12} {:-<50}", "", "");
            for entry in &entries {
                println!("{:<12} {}", format_bytes(entry.size), entry.name);
            }
            println!("\nTotal: {} files", entries.len());
        }
    }

    Ok(())
}

fn cmd_decode(args: DecodeArgs) -> Result<()> {
    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }

    let image = TgaParser::new()
        .parse_file(&args.input)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let defaults = TextureExportOptions::default();
    let format = if args.jpeg {
        ImageFormat::Jpeg {
            quality: args.quality.unwrap_or(defaults.jpeg_quality),
        }
    } else {
        ImageFormat::Png
    };
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, format));

    let written = write_image(&image, &output, format, defaults.png_compression)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if image.alpha_restored() {
        info!("Alpha channel was all zero; written fully opaque");
    }
    println!(
        "{} ({}x{}) -> {} ({})",
        args.input.display(),
        image.width(),
        image.height(),
        output.display(),
        format_bytes(written)
    );

    Ok(())
}

fn default_output(input: &Path, format: ImageFormat) -> PathBuf {
    input.with_extension(format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "texport",
            "-vv",
            "export",
            "--package",
            "baseq3",
            "--package",
            "mod/pak9.pk3",
            "--shaders",
            "shaders.json",
            "--materials",
            "materials.json",
            "--lightmap",
            "maps/q3dm1/lm.png",
            "-o",
            "out",
            "--png-compression",
            "best",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.packages.len(), 2);
        assert_eq!(args.png_compression, CompressionArg::Best);
        assert!(!args.overwrite);
    }

    #[test]
    fn test_cli_requires_package() {
        assert!(Cli::try_parse_from(["texport", "list"]).is_err());
    }

    #[test]
    fn test_decode_quality_range() {
        assert!(Cli::try_parse_from(["texport", "decode", "a.tga", "--jpeg", "--quality", "0"]).is_err());
        assert!(Cli::try_parse_from(["texport", "decode", "a.tga", "--jpeg", "--quality", "85"]).is_ok());
    }

    #[test]
    fn test_load_document_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shaders.json");

        let err = load_document(ShaderTable::from_json_file(&path), "shader", &path).unwrap_err();
        assert!(err.to_string().starts_with("No shader document at"));

        std::fs::write(&path, "{ not json").unwrap();
        let err = load_document(ShaderTable::from_json_file(&path), "shader", &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load shader document"));
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("textures/wall.tga"), ImageFormat::Png),
            PathBuf::from("textures/wall.png")
        );
        assert_eq!(
            default_output(Path::new("wall.TGA"), ImageFormat::Jpeg { quality: 90 }),
            PathBuf::from("wall.jpg")
        );
    }
}
