use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use colonycount::batch::{self, BatchOptions};
use colonycount::{AnalysisConfig, ColonyPipeline, Magnification, PipelineVariant, logging};

#[derive(Parser)]
#[command(name = "colonycount")]
#[command(about = "Count colonies on agar-plate images, folder by folder")]
struct Cli {
    /// Root directory to search for plate images
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    input: PathBuf,

    /// Objective magnification, picks the microns-per-pixel scale
    #[arg(short, long, value_enum)]
    magnification: Option<Magnification>,

    /// Use the stained-plate pipeline (edge augmentation, hull smoothing)
    #[arg(short, long)]
    stained: bool,

    /// TOML file overriding the preset parameters
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report path (default: <input>/output.csv)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save intermediate images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Image extensions to analyse
    #[arg(long, value_delimiter = ',', default_value = "jpg")]
    extensions: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Significance multiplier (fraction of local background)
    #[arg(long)]
    significance: Option<f64>,

    /// Gradient map downsampling factor
    #[arg(long)]
    gradient_resolution: Option<f64>,

    /// Minimum colony size in um^2 (exclusive)
    #[arg(long, value_name = "UM2")]
    min_size: Option<f64>,

    /// Microns per pixel, overrides --magnification
    #[arg(long, value_name = "UM")]
    scale: Option<f64>,

    /// Working resolution as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    working_size: Option<(u32, u32)>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width '{}': {}", w, e))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height '{}': {}", h, e))?;
    Ok((w, h))
}

impl Cli {
    /// Preset, then config file, then command-line overrides.
    fn analysis_config(&self) -> anyhow::Result<AnalysisConfig> {
        let variant = if self.stained {
            PipelineVariant::Stained
        } else {
            PipelineVariant::Unstained
        };

        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_toml_file(path, variant)?,
            None => AnalysisConfig::for_variant(variant),
        };

        if let Some(magnification) = self.magnification {
            config = config.with_magnification(magnification);
        }
        if let Some(scale) = self.scale {
            config.pixel_scale_um = scale;
        }
        if let Some(significance) = self.significance {
            config.significance_multiplier = significance;
        }
        if let Some(g) = self.gradient_resolution {
            config.gradient_resolution = g;
        }
        if let Some(min_size) = self.min_size {
            config.min_colony_size_um2 = min_size;
        }
        if let Some((w, h)) = self.working_size {
            config = config.with_working_size(w, h);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    let config = args.analysis_config()?;
    debug!(?config, "analysis parameters");
    info!(
        "Counting {} plates at {} um/px",
        config.variant, config.pixel_scale_um
    );

    let mut pipeline = ColonyPipeline::new(config)?;
    if let Some(debug_dir) = &args.debug_out {
        pipeline = pipeline.with_debug(debug_dir.clone())?;
        info!("Debug mode enabled: {}", debug_dir.display());
    }

    let options = BatchOptions {
        root: args.input.clone(),
        report_path: args.output.clone(),
        extensions: args.extensions.clone(),
        jobs: args.jobs,
    };

    let summary = batch::run(&pipeline, &options)?;
    if summary.failures > 0 {
        warn!("{} image(s) could not be analyzed", summary.failures);
    }
    info!("Report written to {}", summary.report_path.display());
    println!(
        "Total colony count: {} ({} folders)",
        summary.total_colonies,
        summary.folders.len()
    );

    Ok(())
}
