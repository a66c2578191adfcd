use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use svmatrix::lowlevel::tile_count;
use svmatrix::{
    write_matrix, ComputeOptions, ImageParams, SinoParams, SvParams, SystemMatrix,
};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Precompute a packed MBIR system matrix (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct ImageJson {
    nx: usize,
    ny: usize,
    delta_xy: f32,
}

#[derive(Debug, Deserialize)]
struct SinoJson {
    n_views: usize,
    n_channels: usize,
    delta_channel: f32,
    center_offset: f32,
    /// Explicit view angles in radians; defaults to a uniform sweep of
    /// `n_views` angles over half a turn.
    view_angles: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct SvJson {
    sv_length: usize,
    overlap: usize,
    piece_length: usize,
}

#[derive(Debug, Deserialize)]
struct Config {
    image: ImageJson,
    sino: SinoJson,
    sv: SvJson,
    /// Raw reconstruction mask file of `nx * ny` bytes; defaults to all-ones.
    mask_path: Option<String>,
    output_path: String,
    #[serde(default)]
    parallel: bool,
}

#[derive(Debug, Serialize)]
struct Output {
    output_path: String,
    n_sv: usize,
    n_voxels: usize,
    packed_bytes: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("svmatrix=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.output_path.is_empty() {
        return Err("output_path must be set in the config".into());
    }

    let img = ImageParams {
        nx: config.image.nx,
        ny: config.image.ny,
        delta_xy: config.image.delta_xy,
    };
    let view_angles = match config.sino.view_angles {
        Some(angles) => angles,
        None => uniform_angles(config.sino.n_views),
    };
    let sino = SinoParams {
        n_views: config.sino.n_views,
        n_channels: config.sino.n_channels,
        delta_channel: config.sino.delta_channel,
        center_offset: config.sino.center_offset,
        view_angles,
    };
    let mut svpar = SvParams {
        sv_length: config.sv.sv_length,
        overlap: config.sv.overlap,
        piece_length: config.sv.piece_length,
        n_sv: 0,
    };
    svpar.n_sv = tile_count(&img, &svpar);

    let mask = match &config.mask_path {
        Some(path) => {
            let mask = fs::read(path)?;
            if mask.len() != img.n_voxels() {
                return Err(format!(
                    "mask file {path} holds {} bytes, expected {}",
                    mask.len(),
                    img.n_voxels()
                )
                .into());
            }
            mask
        }
        None => vec![1u8; img.n_voxels()],
    };

    let options = ComputeOptions {
        parallel: config.parallel,
    };
    let matrix = SystemMatrix::compute_with(&img, &sino, &svpar, &mask, &options)?;
    write_matrix(&config.output_path, &matrix, &img, &sino, &svpar)?;

    let packed_bytes = matrix
        .svs
        .iter()
        .flat_map(|sv| sv.voxels.iter())
        .map(|v| v.len())
        .sum();
    let output = Output {
        output_path: config.output_path,
        n_sv: svpar.n_sv,
        n_voxels: img.n_voxels(),
        packed_bytes,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Evenly spaced view angles over half a turn, the usual parallel-beam sweep.
fn uniform_angles(n_views: usize) -> Vec<f32> {
    (0..n_views)
        .map(|i| i as f32 * std::f32::consts::PI / n_views as f32)
        .collect()
}
