//! Analysis configuration.
//!
//! Every tunable of the per-image pipeline lives in [`AnalysisConfig`] and is
//! passed explicitly into the analysis, so concurrent runs with different
//! magnifications or stain settings never share state.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::morphology::MAX_ELEMENT_SIZE;
use crate::error::{AnalysisError, Result};

/// Which mask stages run between gradient correction and contour extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Canny edges are added to the mask and accepted contours are replaced
    /// by their convex hull.
    Stained,
    /// The mask is closed and dilated; contours are measured as found.
    Unstained,
}

impl PipelineVariant {
    /// Whether accepted contours are replaced by their convex hull.
    pub fn smooths_contours(self) -> bool {
        matches!(self, PipelineVariant::Stained)
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineVariant::Stained => write!(f, "stained"),
            PipelineVariant::Unstained => write!(f, "unstained"),
        }
    }
}

/// Microscope objective, used to pick the calibrated microns-per-pixel scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Magnification {
    #[default]
    #[serde(rename = "4x", alias = "4X")]
    #[value(name = "4x", alias = "4X")]
    X4,
    #[serde(rename = "10x", alias = "10X")]
    #[value(name = "10x", alias = "10X")]
    X10,
}

impl Magnification {
    /// Calibrated microns per pixel for this objective.
    pub fn pixel_scale_um(self) -> f64 {
        match self {
            Magnification::X4 => 2.39,
            Magnification::X10 => 3.38,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Fraction of the local background a pixel must be at or below to count
    /// as colony. Smaller is more selective.
    pub significance_multiplier: f64,
    /// Downsampling factor for the gradient map, in (0, 1].
    pub gradient_resolution: f64,
    pub working_width: u32,
    pub working_height: u32,
    /// Smallest accepted colony, exclusive.
    pub min_colony_size_um2: f64,
    pub pixel_scale_um: f64,
    pub variant: PipelineVariant,

    pub median_radius: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Side of the elliptical structuring element used by the denoiser.
    pub kernel_size: u32,
    pub dilate_iterations: u32,
}

impl AnalysisConfig {
    /// Defaults for stained plates.
    pub fn stained() -> Self {
        Self {
            significance_multiplier: 0.4,
            min_colony_size_um2: 2000.0,
            variant: PipelineVariant::Stained,
            ..Self::base()
        }
    }

    /// Defaults for unstained plates.
    pub fn unstained() -> Self {
        Self {
            significance_multiplier: 0.5,
            min_colony_size_um2: 172.0,
            variant: PipelineVariant::Unstained,
            ..Self::base()
        }
    }

    pub fn for_variant(variant: PipelineVariant) -> Self {
        match variant {
            PipelineVariant::Stained => Self::stained(),
            PipelineVariant::Unstained => Self::unstained(),
        }
    }

    fn base() -> Self {
        Self {
            significance_multiplier: 0.5,
            gradient_resolution: 0.03,
            working_width: 1500,
            working_height: 1000,
            min_colony_size_um2: 172.0,
            pixel_scale_um: Magnification::X4.pixel_scale_um(),
            variant: PipelineVariant::Unstained,
            median_radius: 3,
            canny_low: 50.0,
            canny_high: 150.0,
            kernel_size: 4,
            dilate_iterations: 4,
        }
    }

    pub fn with_magnification(mut self, magnification: Magnification) -> Self {
        self.pixel_scale_um = magnification.pixel_scale_um();
        self
    }

    pub fn with_working_size(mut self, width: u32, height: u32) -> Self {
        self.working_width = width;
        self.working_height = height;
        self
    }

    /// Load a TOML file whose fields are all optional.
    ///
    /// Missing fields come from the preset of the file's `variant`, or of
    /// `default_variant` when the file does not name one.
    pub fn from_toml_file(path: &Path, default_variant: PipelineVariant) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml_str(&text, default_variant)
    }

    pub fn from_toml_str(text: &str, default_variant: PipelineVariant) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let config = file.into_config(default_variant);
        config.validate()?;
        Ok(config)
    }

    /// Check the preconditions the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        positive("significance_multiplier", self.significance_multiplier)?;
        positive("gradient_resolution", self.gradient_resolution)?;
        if self.gradient_resolution > 1.0 {
            return Err(AnalysisError::invalid(
                "gradient_resolution",
                format!("must be in (0, 1], got {}", self.gradient_resolution),
            ));
        }
        if self.working_width == 0 || self.working_height == 0 {
            return Err(AnalysisError::invalid(
                "working_width/working_height",
                format!(
                    "working size must be non-zero, got {}x{}",
                    self.working_width, self.working_height
                ),
            ));
        }
        if !self.min_colony_size_um2.is_finite() || self.min_colony_size_um2 < 0.0 {
            return Err(AnalysisError::invalid(
                "min_colony_size_um2",
                format!("must be finite and non-negative, got {}", self.min_colony_size_um2),
            ));
        }
        if !self.pixel_scale_um.is_finite() || self.pixel_scale_um <= 0.0 {
            return Err(AnalysisError::invalid(
                "pixel_scale_um",
                format!("must be finite and positive, got {}", self.pixel_scale_um),
            ));
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() || self.canny_low > self.canny_high {
            return Err(AnalysisError::invalid(
                "canny_low/canny_high",
                format!("need low <= high, got {} / {}", self.canny_low, self.canny_high),
            ));
        }
        if self.kernel_size == 0 || self.kernel_size > MAX_ELEMENT_SIZE {
            return Err(AnalysisError::invalid(
                "kernel_size",
                format!("must be in 1..={}, got {}", MAX_ELEMENT_SIZE, self.kernel_size),
            ));
        }
        Ok(())
    }

    /// Size of the gradient map this config produces, as printed in the report header.
    pub fn gradient_map_size(&self) -> (f64, f64) {
        let g = self.gradient_resolution;
        (self.working_width as f64 * g, self.working_height as f64 * g)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::unstained()
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid(
            field,
            format!("must be finite and positive, got {}", value),
        ))
    }
}

/// On-disk form of [`AnalysisConfig`]; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    variant: Option<PipelineVariant>,
    magnification: Option<Magnification>,
    significance_multiplier: Option<f64>,
    gradient_resolution: Option<f64>,
    working_width: Option<u32>,
    working_height: Option<u32>,
    min_colony_size_um2: Option<f64>,
    pixel_scale_um: Option<f64>,
    median_radius: Option<u32>,
    canny_low: Option<f32>,
    canny_high: Option<f32>,
    kernel_size: Option<u32>,
    dilate_iterations: Option<u32>,
}

impl ConfigFile {
    fn into_config(self, default_variant: PipelineVariant) -> AnalysisConfig {
        let mut config = AnalysisConfig::for_variant(self.variant.unwrap_or(default_variant));

        if let Some(magnification) = self.magnification {
            config.pixel_scale_um = magnification.pixel_scale_um();
        }
        // An explicit scale wins over the magnification lookup.
        if let Some(v) = self.pixel_scale_um {
            config.pixel_scale_um = v;
        }
        if let Some(v) = self.significance_multiplier {
            config.significance_multiplier = v;
        }
        if let Some(v) = self.gradient_resolution {
            config.gradient_resolution = v;
        }
        if let Some(v) = self.working_width {
            config.working_width = v;
        }
        if let Some(v) = self.working_height {
            config.working_height = v;
        }
        if let Some(v) = self.min_colony_size_um2 {
            config.min_colony_size_um2 = v;
        }
        if let Some(v) = self.median_radius {
            config.median_radius = v;
        }
        if let Some(v) = self.canny_low {
            config.canny_low = v;
        }
        if let Some(v) = self.canny_high {
            config.canny_high = v;
        }
        if let Some(v) = self.kernel_size {
            config.kernel_size = v;
        }
        if let Some(v) = self.dilate_iterations {
            config.dilate_iterations = v;
        }
        config
    }
}
