use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ps1tex::codec;
use ps1tex::error::ErrorNotice;
use ps1tex::models::{
    AppConfig, ProcessingOutcome, ProcessingParameters, COLOR_DEPTH_STEPS, PIPELINE_COLOR_DEPTH,
    PIPELINE_RESOLUTION, RESOLUTION_STEPS,
};
use ps1tex::services::{DegradePipeline, ImageProcessor};
use retro_raster::ColorReducer;

#[derive(Parser)]
#[command(name = "ps1tex")]
#[command(about = "Degrade images into PS1-style textures")]
struct Cli {
    /// Path to a YAML config file (defaults to $PS1TEX_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Degrade a PNG and write the result
    Process {
        /// Input PNG file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PNG file (defaults to ps1-texture-<millis>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Length of the longer side in pixels
        #[arg(short, long)]
        resolution: Option<u32>,

        /// Palette size, or levels per channel when dithering
        #[arg(short, long)]
        colors: Option<u32>,

        /// Floyd-Steinberg dithering instead of k-means reduction
        #[arg(long)]
        dither: bool,

        /// Use resolution and colors as given instead of snapping to steps
        #[arg(long)]
        exact: bool,
    },
    /// Print the k-means palette of a PNG
    Palette {
        /// Input PNG file
        #[arg(short, long)]
        input: PathBuf,

        /// Number of colors
        #[arg(short, long, default_value = "16")]
        colors: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ps1tex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Some(Commands::Process {
            input,
            output,
            resolution,
            colors,
            dither,
            exact,
        }) => {
            let resolution = resolution.unwrap_or(config.defaults.resolution);
            let colors = colors.unwrap_or(config.defaults.color_depth);
            let dithering = dither || config.defaults.dithering;
            let params = if exact {
                ProcessingParameters::new(resolution, colors, dithering)
            } else {
                ProcessingParameters::snapped(resolution, colors, dithering)
            };
            run_process_command(&config, &input, output, params).await
        }
        Some(Commands::Palette { input, colors }) => run_palette_command(&config, &input, colors),
        None => {
            print_settings(&config);
            Ok(())
        }
    }
}

async fn run_process_command(
    config: &AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    params: ProcessingParameters,
) -> anyhow::Result<()> {
    let loaded = codec::load_image(input, config.max_file_size)?;

    let processor = ImageProcessor::with_pipeline(DegradePipeline::with_seed(config.palette_seed));
    let ticket = processor.submit(loaded.image, params, |update| {
        tracing::info!(progress = update.progress, stage = ?update.stage, "Processing");
    });

    match ticket.outcome().await {
        ProcessingOutcome::Success { image } => {
            let output = output.unwrap_or_else(|| PathBuf::from(codec::default_export_name()));
            let written = codec::save_image(&image, &output, config.optimize_png)?;
            println!(
                "Wrote {} ({}x{}, {} colors{})",
                written.display(),
                image.width(),
                image.height(),
                params.color_depth,
                if params.dithering { ", dithered" } else { "" }
            );
            Ok(())
        }
        ProcessingOutcome::Failure { reason, detail } => {
            let notice = ErrorNotice::new(reason, detail);
            anyhow::bail!("{} ({})", notice.message, notice.detail)
        }
        ProcessingOutcome::Cancelled => anyhow::bail!("Processing was cancelled"),
    }
}

fn run_palette_command(config: &AppConfig, input: &Path, colors: u32) -> anyhow::Result<()> {
    let loaded = codec::load_image(input, config.max_file_size)?;
    let mut reducer = ColorReducer::seeded(config.palette_seed);
    let palette = reducer.generate_palette(&loaded.image, colors)?;

    for color in palette {
        println!("{}", color.to_hex());
    }
    Ok(())
}

fn print_settings(config: &AppConfig) {
    let join = |steps: &[u32]| {
        steps
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("ps1tex - PS1-style texture degradation\n");
    println!("Defaults:");
    println!("  resolution:  {}", config.defaults.resolution);
    println!("  colors:      {}", config.defaults.color_depth);
    println!("  dithering:   {}", config.defaults.dithering);
    println!("  debounce:    {}ms", config.debounce_ms);
    println!();
    println!(
        "Resolution steps:  {} (accepted {}-{})",
        join(&RESOLUTION_STEPS),
        PIPELINE_RESOLUTION.start(),
        PIPELINE_RESOLUTION.end()
    );
    println!(
        "Color depth steps: {} (accepted {}-{})",
        join(&COLOR_DEPTH_STEPS),
        PIPELINE_COLOR_DEPTH.start(),
        PIPELINE_COLOR_DEPTH.end()
    );
    println!("\nRun `ps1tex process --help` to degrade an image.");
}
