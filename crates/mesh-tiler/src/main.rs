//! Command-line entry point for the mesh tiler.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mesh_tiler::config::{
    DEFAULT_EDGE_WEIGHT, DEFAULT_MESH_QUALITY, DEFAULT_NUM_LAYERS, DEFAULT_NUM_THREADS,
    DEFAULT_SIMPLIFICATION_MAX, DEFAULT_SIMPLIFICATION_MIN, DEFAULT_TEXTURE_WEIGHT, TilerConfig,
};

#[derive(Parser)]
#[command(about = "Cut a textured OBJ model into LOD tiles")]
struct CliArgs {
    /// Input OBJ model.
    #[arg(default_value = "data/in/model/better_model.obj")]
    input: PathBuf,

    /// Output root; tiles go to `<output>/<model name>/`.
    #[arg(long, short, default_value = "data/out")]
    output: PathBuf,

    /// Number of LOD layers.
    #[arg(long, default_value_t = DEFAULT_NUM_LAYERS)]
    layers: u32,

    /// Number of worker threads.
    #[arg(long, default_value_t = DEFAULT_NUM_THREADS)]
    threads: usize,

    /// Fraction of geometry to keep on the coarsest layer.
    #[arg(long, default_value_t = DEFAULT_SIMPLIFICATION_MIN)]
    simplification_min: f64,

    /// Fraction of geometry to keep on the finest layer.
    #[arg(long, default_value_t = DEFAULT_SIMPLIFICATION_MAX)]
    simplification_max: f64,

    /// Face quality threshold for simplification (0..1).
    #[arg(long, default_value_t = DEFAULT_MESH_QUALITY)]
    mesh_quality: f64,

    /// Boundary edge preservation weight.
    #[arg(long, default_value_t = DEFAULT_EDGE_WEIGHT)]
    edge_weight: f64,

    /// Texture coordinate preservation weight.
    #[arg(long, default_value_t = DEFAULT_TEXTURE_WEIGHT)]
    texture_weight: f64,
}

impl From<CliArgs> for TilerConfig {
    fn from(args: CliArgs) -> Self {
        TilerConfig {
            num_layers: args.layers,
            num_threads: args.threads,
            simplification_min: args.simplification_min,
            simplification_max: args.simplification_max,
            mesh_quality: args.mesh_quality,
            edge_weight: args.edge_weight,
            texture_weight: args.texture_weight,
            ..TilerConfig::new(args.input, args.output)
        }
    }
}

fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let config: TilerConfig = CliArgs::parse().into();
    let start = std::time::Instant::now();

    match mesh_tiler::run(&config) {
        Ok(report) => {
            tracing::info!(
                "Done in {:.1}s: {} tiles, {} failed tasks",
                start.elapsed().as_secs_f64(),
                report.manifest.tile_count(),
                report.tasks.failed
            );
            if report.tasks.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
