use image::GrayImage;

use crate::detection::morphology::{self, StructuringElement};
use crate::detection::preprocessing;
use crate::error::Result;
use crate::pipeline::{MaskStep, PipelineContext};

/// Add Canny edges of the original image to the mask.
///
/// Stained colonies can show up as a light ring on a darker background,
/// which the darker-than-background rule misses. Rings that close become
/// contours; open edge fragments stay small and fall to the size filter.
pub struct EdgeAugmentStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl MaskStep for EdgeAugmentStep {
    fn process(&self, mask: GrayImage, original: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        let edges = preprocessing::detect_edges(original, self.low_threshold, self.high_threshold);
        Ok(preprocessing::union_with_edges(&mask, &edges))
    }

    fn name(&self) -> &str {
        "Edge Augmentation"
    }
}

/// Close the mask, then dilate it repeatedly to merge fragmented colonies.
pub struct DenoiseStep {
    pub kernel_size: u32,
    pub iterations: u32,
}

impl MaskStep for DenoiseStep {
    fn process(&self, mask: GrayImage, _original: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        let element = StructuringElement::ellipse(self.kernel_size, self.kernel_size);
        Ok(morphology::denoise(&mask, &element, self.iterations))
    }

    fn name(&self) -> &str {
        "Denoise"
    }
}
