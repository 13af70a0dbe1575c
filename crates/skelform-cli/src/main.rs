//! skelform CLI - inspect, convert and generate skeleton documents
//!
//! Snapshot files are read and written as XML (`.xml`, `.ds3xml`) or JSON
//! (`.json`), chosen by extension.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skelform_document::{Document, DocumentConfig};
use skelform_ir::xml::{load_snapshot_from_xml_string, save_snapshot_to_xml_string};
use skelform_ir::Snapshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skelform")]
#[command(about = "Skeleton-driven modeling documents from the command line", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Document options (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display entity counts of a snapshot file
    Info {
        /// Snapshot file
        file: PathBuf,
    },
    /// Convert a snapshot between XML and JSON
    Convert {
        /// Input snapshot
        input: PathBuf,
        /// Output snapshot (format determined by extension)
        output: PathBuf,
    },
    /// Generate mesh, texture and rig from a snapshot
    Generate {
        /// Snapshot file
        file: PathBuf,
        /// Write the result mesh as Wavefront OBJ
        #[arg(long)]
        obj: Option<PathBuf>,
        /// Write the baked color texture as PNG
        #[arg(long)]
        texture: Option<PathBuf>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
}

/// Snapshot text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Xml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "xml" | "ds3xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            _ => bail!("Unknown snapshot format: {}", path.display()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => DocumentConfig::load(path)?,
        None => DocumentConfig::default(),
    };

    match cli.command {
        Commands::Info { file } => show_info(&file)?,
        Commands::Convert { input, output } => convert(&input, &output)?,
        Commands::Generate {
            file,
            obj,
            texture,
            timeout,
        } => generate(&file, config, obj.as_deref(), texture.as_deref(), timeout)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let format = Format::from_path(path)?;
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot = match format {
        Format::Xml => load_snapshot_from_xml_string(&text)?,
        Format::Json => Snapshot::from_json(&text)?,
    };
    Ok(snapshot)
}

fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let text = match Format::from_path(path)? {
        Format::Xml => save_snapshot_to_xml_string(snapshot)?,
        Format::Json => snapshot.to_json()?,
    };
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn show_info(file: &Path) -> Result<()> {
    let snapshot = read_snapshot(file)?;

    println!("skelform snapshot: {}", file.display());
    println!("  Nodes: {}", snapshot.nodes.len());
    println!("  Edges: {}", snapshot.edges.len());
    println!("  Parts: {}", snapshot.parts.len());
    println!("  Components: {}", snapshot.components.len());
    println!("  Bones: {}", snapshot.bones.len());
    if let Some(bounds) = snapshot.node_bounds() {
        let [x, y, z] = bounds.center();
        println!("  Node center: ({x:.3}, {y:.3}, {z:.3})");
    }
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let snapshot = read_snapshot(input)?;
    write_snapshot(&snapshot, output)?;
    println!("Converted {} to {}", input.display(), output.display());
    Ok(())
}

fn generate(
    file: &Path,
    config: DocumentConfig,
    obj: Option<&Path>,
    texture: Option<&Path>,
    timeout: u64,
) -> Result<()> {
    let snapshot = read_snapshot(file)?;
    let mut doc = Document::with_config(DocumentConfig {
        chain_after_mesh: true,
        ..config
    });
    doc.from_snapshot(&snapshot);
    doc.settle_origin();

    doc.generate_mesh();
    if !doc.wait_until_export_ready(Duration::from_secs(timeout)) {
        bail!("Generation did not finish within {timeout}s");
    }
    if !doc.is_mesh_generation_succeed() {
        bail!("Mesh generation failed");
    }
    let Some(mesh) = doc.take_result_mesh() else {
        bail!("Document has no geometry to generate");
    };
    info!(vertices = mesh.num_vertices(), "generation finished");

    println!("Mesh stats:");
    println!("  Vertices: {}", mesh.num_vertices());
    println!("  Triangles: {}", mesh.num_triangles());

    if !doc.bone_id_list().is_empty() {
        println!("\nBones:");
        for bone_id in doc.bone_id_list() {
            let Some(bone) = doc.find_bone(*bone_id) else {
                continue;
            };
            let per_joint: Vec<String> = bone
                .vertex_weights
                .iter()
                .map(|weights| weights.len().to_string())
                .collect();
            let total: usize = bone.vertex_weights.iter().map(Vec::len).sum();
            println!(
                "  {}: {} joint(s), {} weighted vertices [{}]",
                bone.name,
                bone.joints.len(),
                total,
                per_joint.join(", ")
            );
        }
    }

    if let Some(path) = obj {
        fs::write(path, mesh.to_obj_string())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("\nExported OBJ to {}", path.display());
    }
    if let Some(path) = texture {
        let Some(image) = doc.texture_color_image() else {
            bail!("No texture was generated");
        };
        image
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Exported texture to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.xml")).unwrap(), Format::Xml);
        assert_eq!(Format::from_path(Path::new("a.DS3XML")).unwrap(), Format::Xml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::from_path(Path::new("a.ds3")).is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "skelform", "-v", "generate", "model.xml", "--obj", "out.obj", "--timeout", "5",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate { file, obj, texture, timeout } => {
                assert_eq!(file, PathBuf::from("model.xml"));
                assert_eq!(obj, Some(PathBuf::from("out.obj")));
                assert_eq!(texture, None);
                assert_eq!(timeout, 5);
            }
            _ => panic!("expected generate"),
        }
    }
}
