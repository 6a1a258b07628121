//! Binary-mask morphology on top of `imageproc::morphology`.
//!
//! Pixels outside the image never take part: they add nothing to a dilation
//! and never erode an edge pixel.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_close, grayscale_dilate, grayscale_erode};

/// Largest element side `imageproc` accepts for a mask image.
pub const MAX_ELEMENT_SIZE: u32 = 511;

/// A structuring element: its footprint image and the mask built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    footprint: GrayImage,
    anchor: (u32, u32),
    mask: Mask,
}

impl StructuringElement {
    fn from_footprint(footprint: GrayImage, anchor: (u32, u32)) -> Self {
        let mask = Mask::from_image(&footprint, anchor.0 as u8, anchor.1 as u8);
        Self {
            footprint,
            anchor,
            mask,
        }
    }

    /// Ellipse inscribed in a `width × height` box, anchored at `(width/2, height/2)`.
    ///
    /// Rows are filled symmetrically around the anchor column, so even sizes
    /// produce the same lopsided footprint OpenCV's `MORPH_ELLIPSE` does.
    /// Sides are clamped to `1..=MAX_ELEMENT_SIZE`.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_ELEMENT_SIZE) as i32;
        let height = height.clamp(1, MAX_ELEMENT_SIZE) as i32;
        let r = height / 2;
        let c = width / 2;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut footprint = GrayImage::new(width as u32, height as u32);
        for i in 0..height {
            let dy = i - r;
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(width);
            for j in j1..j2 {
                footprint.put_pixel(j as u32, i as u32, Luma([255]));
            }
        }

        Self::from_footprint(footprint, (c as u32, r as u32))
    }

    /// Full `(2·radius + 1)²` square centred on the anchor.
    pub fn square(radius: u32) -> Self {
        let radius = radius.min(MAX_ELEMENT_SIZE / 2);
        let side = 2 * radius + 1;
        Self::from_footprint(GrayImage::from_pixel(side, side, Luma([255])), (radius, radius))
    }

    /// Whether offset `(dx, dy)` from the anchor is part of the element.
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        let x = self.anchor.0 as i32 + dx;
        let y = self.anchor.1 as i32 + dy;
        x >= 0
            && y >= 0
            && (x as u32) < self.footprint.width()
            && (y as u32) < self.footprint.height()
            && self.footprint.get_pixel(x as u32, y as u32)[0] != 0
    }

    pub fn len(&self) -> usize {
        self.footprint.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }
}

pub fn dilate(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_dilate(img, element.mask())
}

pub fn erode(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(img, element.mask())
}

/// Closing: dilate then erode. Fills gaps narrower than the element.
pub fn close(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_close(img, element.mask())
}

/// Closing followed by `iterations` extra dilations with the same element.
pub fn denoise(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut out = close(mask, element);
    for _ in 0..iterations {
        out = dilate(&out, element);
    }
    out
}
