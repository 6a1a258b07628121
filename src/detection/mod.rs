pub mod preprocessing;
pub mod morphology;
pub mod contours;
pub mod colonies;
pub mod qc;
pub mod steps;

use image::GrayImage;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::models::AnalysisResult;
use crate::pipeline::ColonyPipeline;

/// Count colonies in one grayscale image.
///
/// The image is resized to the configured working resolution; the caller's
/// buffer is never modified.
pub fn analyze_image(image: &GrayImage, config: &AnalysisConfig) -> Result<AnalysisResult> {
    ColonyPipeline::new(config.clone())?.analyze(image)
}
