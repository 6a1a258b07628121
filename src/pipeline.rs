use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Pixel, PixelWithColorType};
use tracing::{debug, info};

use crate::config::{AnalysisConfig, PipelineVariant};
use crate::detection::qc::{self, QcStyle};
use crate::detection::steps::{DenoiseStep, EdgeAugmentStep};
use crate::detection::{colonies, contours, preprocessing};
use crate::error::{AnalysisError, Result};
use crate::models::AnalysisResult;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to all mask steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
    /// Name used for this image's debug files.
    pub label: String,
}

impl PipelineContext {
    /// Save an intermediate image as `NN_<step>/<label>.png` when debug mode is on.
    ///
    /// A label may be a relative path; its directories are recreated under the
    /// step folder so images from different folders never share a file.
    pub fn save_debug<P>(&self, index: usize, step_name: &str, image: &ImageBuffer<P, Vec<u8>>) -> Result<()>
    where
        P: Pixel<Subpixel = u8> + PixelWithColorType,
    {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };
        if !debug_config.enabled {
            return Ok(());
        }

        let step_dir_name = format!("{:02}_{}", index, step_name.to_lowercase().replace(' ', "_"));
        let output_path = debug_config
            .output_dir
            .join(&step_dir_name)
            .join(self.debug_file_name());
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AnalysisError::DebugOutput(format!("{}: {}", parent.display(), e)))?;
        }
        image
            .save(&output_path)
            .map_err(|e| AnalysisError::DebugOutput(format!("{}: {}", output_path.display(), e)))?;

        debug!("Debug: saved {}", output_path.display());
        Ok(())
    }

    /// `<label>.png` as a relative path; only plain components of the label survive.
    fn debug_file_name(&self) -> PathBuf {
        let mut relative: PathBuf = Path::new(&self.label)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        let Some(name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return PathBuf::from("image.png");
        };
        relative.set_file_name(format!("{}.png", name));
        relative
    }

    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            debug: self.debug.clone(),
            label: label.into(),
        }
    }
}

/// A stage that refines the binarized mask before contour extraction.
pub trait MaskStep: Send + Sync {
    /// Transform the mask; `original` is the working-resolution grayscale image.
    fn process(&self, mask: GrayImage, original: &GrayImage, context: &PipelineContext) -> Result<GrayImage>;

    /// Human-readable name for this step (used in logs and debug folders)
    fn name(&self) -> &str;
}

/// Mask steps a pipeline variant runs.
pub fn steps_for_variant(config: &AnalysisConfig) -> Vec<Arc<dyn MaskStep>> {
    match config.variant {
        PipelineVariant::Stained => vec![Arc::new(EdgeAugmentStep {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
        })],
        PipelineVariant::Unstained => vec![Arc::new(DenoiseStep {
            kernel_size: config.kernel_size,
            iterations: config.dilate_iterations,
        })],
    }
}

/// Per-image colony counting pipeline.
///
/// Gradient correction, the variant's mask steps, outer contour extraction,
/// size filtering and QC rendering, in that order.
#[derive(Clone)]
pub struct ColonyPipeline {
    config: AnalysisConfig,
    steps: Vec<Arc<dyn MaskStep>>,
    smoothing: bool,
    style: QcStyle,
    context: PipelineContext,
}

impl ColonyPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let steps = steps_for_variant(&config);
        let smoothing = config.variant.smooths_contours();
        Ok(Self {
            config,
            steps,
            smoothing,
            style: QcStyle::default(),
            context: PipelineContext::default(),
        })
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn with_style(mut self, style: QcStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_smoothing(mut self, smoothing: bool) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Replace the variant's mask steps.
    pub fn with_steps(mut self, steps: Vec<Arc<dyn MaskStep>>) -> Self {
        self.steps = steps;
        self
    }

    pub fn add_step(mut self, step: Arc<dyn MaskStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn analyze(&self, image: &GrayImage) -> Result<AnalysisResult> {
        self.analyze_with_context(image, &self.context)
    }

    /// Analyze with `label` naming this image's debug files.
    pub fn analyze_labeled(&self, image: &GrayImage, label: &str) -> Result<AnalysisResult> {
        self.analyze_with_context(image, &self.context.with_label(label))
    }

    fn analyze_with_context(&self, image: &GrayImage, context: &PipelineContext) -> Result<AnalysisResult> {
        let config = &self.config;
        if image.width() == 0 || image.height() == 0 {
            return Err(AnalysisError::EmptyImage);
        }

        let working = preprocessing::resize_to_working(image, config.working_width, config.working_height);
        context.save_debug(0, "input", &working)?;
        debug!(
            from = ?image.dimensions(),
            to = ?working.dimensions(),
            "resized to working resolution"
        );

        let (gradient, mut mask) = preprocessing::correct(
            &working,
            config.gradient_resolution,
            config.median_radius,
            config.significance_multiplier,
        )?;
        debug!(
            cells = ?(gradient.width(), gradient.height()),
            "corrected gradient"
        );
        context.save_debug(1, "gradient map", gradient.as_image())?;
        context.save_debug(2, "corrected", &mask)?;

        for (i, step) in self.steps.iter().enumerate() {
            mask = step.process(mask, &working, context)?;
            debug!(step = step.name(), "mask step done");
            context.save_debug(3 + i, step.name(), &mask)?;
        }

        let found = contours::find_outer_contours(&mask);
        let outcome = colonies::filter(
            &found,
            config.pixel_scale_um,
            config.min_colony_size_um2,
            self.smoothing,
        );

        let qc_image = qc::render(
            &working,
            &outcome.accepted,
            config.min_colony_size_um2,
            config.pixel_scale_um,
            &self.style,
        );
        context.save_debug(3 + self.steps.len(), "qc", &qc_image)?;

        info!(
            image = %context.label,
            contours = found.len(),
            colonies = outcome.count,
            avg_area = outcome.avg_area,
            "colonies counted"
        );

        Ok(AnalysisResult {
            count: outcome.count,
            avg_area: outcome.avg_area,
            areas: outcome.areas,
            accepted: outcome.accepted,
            qc_image,
        })
    }
}
