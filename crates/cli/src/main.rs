//! irrigis CLI - irrigated land mapping from satellite time series

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use irrigis_algorithms::classification::ClassifiedRaster;
use irrigis_algorithms::fusion::{fuse, AnnualClass};
use irrigis_algorithms::postprocess::{postprocess, IrrigatedAreaRaster};
use irrigis_algorithms::validation::irrigated_area_ha;
use irrigis_core::io::{read_geotiff, write_categorical_geotiff};
use irrigis_core::{Raster, Region};
use irrigis_pipeline::PipelineConfig;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "irrigis")]
#[command(author, version, about = "Irrigated land mapping from satellite time series", long_about = None)]
struct Cli {
    /// Verbose output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pipeline configuration file (TOML); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Turn a classified map into a cleaned irrigated-area map (0/1/2)
    Postprocess {
        /// Classified raster (u8 class codes)
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Fuse summer and winter irrigated-area maps into annual classes
    Fuse {
        /// Summer irrigated-area raster
        summer: PathBuf,
        /// Winter irrigated-area raster
        winter: PathBuf,
        /// Output file
        output: PathBuf,
        /// Agricultural year
        #[arg(short, long)]
        year: i32,
        /// Region mask (non-zero inside); the whole grid when absent
        #[arg(short, long)]
        region: Option<PathBuf>,
    },
    /// Irrigated area in hectares of a mask or irrigated-area map
    Area {
        /// Raster where non-zero is irrigated
        input: PathBuf,
        /// Region mask (non-zero inside); the whole grid when absent
        #[arg(short, long)]
        region: Option<PathBuf>,
        /// Tiling factor; does not change the result
        #[arg(short, long)]
        tile_scale: Option<usize>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_u8(path: &Path) -> Result<Raster<u8>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<u8> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    let (rows, cols) = raster.shape();
    info!("Input: {} x {}", cols, rows);
    Ok(raster)
}

fn read_region(path: Option<&Path>, template: &Raster<u8>) -> Result<Region> {
    match path {
        Some(path) => {
            let mask = read_u8(path)?.map(|v| u8::from(v != 0));
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("region")
                .to_string();
            Ok(Region::from_mask(name, mask))
        }
        None => Ok(Region::covering("region", template)),
    }
}

fn write_result(raster: &Raster<u8>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_categorical_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Config { output } => {
            let text = config
                .to_toml_string()
                .context("Failed to serialize configuration")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Configuration saved to: {}", path.display());
                }
                None => print!("{text}"),
            }
        }

        Commands::Postprocess { input, output } => {
            let classes = read_u8(&input)?;
            let start = Instant::now();
            let classified = ClassifiedRaster {
                classes,
                scores: None,
                overridden: None,
            };
            let pb = spinner("Removing speckle and filling holes...");
            let irrigated = postprocess(&classified, &config.postprocess)
                .context("Failed to post-process classification")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();
            write_result(irrigated.raster(), &output)?;
            println!(
                "  Crops: {} cells, trees: {} cells",
                irrigated.raster().count_where(|v| v == IrrigatedAreaRaster::CROP),
                irrigated.raster().count_where(|v| v == IrrigatedAreaRaster::TREE)
            );
            done("Irrigated area", &output, elapsed);
        }

        Commands::Fuse {
            summer,
            winter,
            output,
            year,
            region,
        } => {
            let summer = IrrigatedAreaRaster::from_raster(read_u8(&summer)?)
                .context("Summer map is not an irrigated-area raster")?;
            let winter = IrrigatedAreaRaster::from_raster(read_u8(&winter)?)
                .context("Winter map is not an irrigated-area raster")?;
            let region = read_region(region.as_deref(), summer.raster())?;
            let start = Instant::now();
            let fused = fuse(&summer, &winter, &region, year).context("Failed to fuse seasons")?;
            let elapsed = start.elapsed();
            write_result(&fused.annual, &output)?;
            for (class, count) in AnnualClass::ALL.iter().zip(fused.class_counts()) {
                println!("  {:>2} {:<18} {}", class.code(), class.label(), count);
            }
            done("Annual classes", &output, elapsed);
        }

        Commands::Area {
            input,
            region,
            tile_scale,
        } => {
            let mask = read_u8(&input)?;
            let region = read_region(region.as_deref(), &mask)?;
            let tile_scale = tile_scale.unwrap_or(config.validation.tile_scale);
            let start = Instant::now();
            let area = irrigated_area_ha(&mask, &region, tile_scale)
                .context("Failed to compute irrigated area")?;
            println!("Irrigated area: {:.2} ha", area);
            println!("  Processing time: {:.2?}", start.elapsed());
        }
    }

    Ok(())
}
