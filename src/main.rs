//! Marrow CLI
//!
//! Command-line interface for inspecting, reporting on and merging
//! skeletal mesh (.psk) and animation (.psa) files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use marrow_core::logging::{self, TracingConfig};
use marrow_format::anim::AnimFile;
use marrow_format::skin::SkinFile;
use marrow_pipeline::report::{anim_report, skin_report};

/// Marrow - skeletal mesh and animation export toolkit
#[derive(Parser)]
#[command(name = "marrow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show summary information about a mesh or animation file
    Info(InfoArgs),

    /// Render a full material/bone/clip report
    Report(ReportArgs),

    /// Merge animation files into one
    Merge(MergeArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a .psk or .psa file
    path: PathBuf,
}

#[derive(Args)]
struct ReportArgs {
    /// Path to a .psk or .psa file
    path: PathBuf,
}

#[derive(Args)]
struct MergeArgs {
    /// Animation files to merge, in order
    #[arg(required = true, num_args = 2..)]
    inputs: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,
}

fn setup_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    logging::init_with_config(TracingConfig {
        default_level: default_level.to_string(),
        show_target: verbosity >= 2,
        show_thread_ids: verbosity >= 3,
        show_file: verbosity >= 3,
        show_line_number: verbosity >= 3,
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info(args) => cmd_info(args, cli.format),
        Commands::Report(args) => cmd_report(args),
        Commands::Merge(args) => cmd_merge(args),
    }
}

enum Loaded {
    Skin(SkinFile),
    Anim(AnimFile),
}

fn load(path: &Path) -> Result<Loaded> {
    if !path.exists() {
        bail!("File not found: {:?}", path);
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    match ext.as_str() {
        "psk" => Ok(Loaded::Skin(
            SkinFile::read_file(path).with_context(|| format!("reading {:?}", path))?,
        )),
        "psa" => Ok(Loaded::Anim(
            AnimFile::read_file(path).with_context(|| format!("reading {:?}", path))?,
        )),
        _ => bail!("Unrecognized extension on {:?}, expected .psk or .psa", path),
    }
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    match load(&args.path)? {
        Loaded::Skin(skin) => match format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "skeletal mesh",
                    "path": args.path,
                    "points": skin.points.len(),
                    "wedges": skin.wedges.len(),
                    "faces": skin.faces.len(),
                    "materials": skin.materials.len(),
                    "bones": skin.bones.len(),
                    "influences": skin.influences.len(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                println!("Skeletal mesh: {:?}", args.path);
                println!("  Points:     {}", skin.points.len());
                println!("  Wedges:     {}", skin.wedges.len());
                println!("  Faces:      {}", skin.faces.len());
                println!("  Materials:  {}", skin.materials.len());
                println!("  Bones:      {}", skin.bones.len());
                println!("  Influences: {}", skin.influences.len());
            }
        },
        Loaded::Anim(anim) => match format {
            OutputFormat::Json => {
                let clips: Vec<_> = anim
                    .clips
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "name": c.name,
                            "frames": c.num_raw_frames,
                            "rate": c.anim_rate,
                        })
                    })
                    .collect();
                let json = serde_json::json!({
                    "type": "animation",
                    "path": args.path,
                    "bones": anim.bones.len(),
                    "keys": anim.keys.len(),
                    "clips": clips,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                println!("Animation: {:?}", args.path);
                println!("  Bones: {}", anim.bones.len());
                println!("  Clips: {}", anim.clips.len());
                println!("  Keys:  {}", anim.keys.len());
                for clip in &anim.clips {
                    println!(
                        "    {:<24} {} frames @ {:.2} fps",
                        clip.name, clip.num_raw_frames, clip.anim_rate
                    );
                }
            }
        },
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let text = match load(&args.path)? {
        Loaded::Skin(skin) => skin_report(&skin),
        Loaded::Anim(anim) => anim_report(&anim),
    };
    print!("{text}");
    Ok(())
}

fn cmd_merge(args: MergeArgs) -> Result<()> {
    let mut merged = AnimFile::default();
    for input in &args.inputs {
        let anim = AnimFile::read_file(input).with_context(|| format!("reading {:?}", input))?;
        merged
            .merge(anim)
            .with_context(|| format!("merging {:?}", input))?;
    }

    merged
        .write_file(&args.output)
        .with_context(|| format!("writing {:?}", args.output))?;
    info!(
        clips = merged.clips.len(),
        keys = merged.keys.len(),
        output = ?args.output,
        "Merged animations"
    );
    Ok(())
}
