#![allow(dead_code)]

use std::path::Path;

use colonycount::AnalysisConfig;
use image::{GrayImage, Luma};

pub const PLATE_WIDTH: u32 = 300;
pub const PLATE_HEIGHT: u32 = 200;
pub const BACKGROUND: u8 = 200;
pub const COLONY: u8 = 40;

/// A dark disc on a synthetic plate.
#[derive(Debug, Clone, Copy)]
pub struct Disc {
    pub cx: i32,
    pub cy: i32,
    pub radius: i32,
}

pub const fn disc(cx: i32, cy: i32, radius: i32) -> Disc {
    Disc { cx, cy, radius }
}

impl Disc {
    fn contains(&self, x: u32, y: u32) -> bool {
        let dx = x as i32 - self.cx;
        let dy = y as i32 - self.cy;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * (self.radius * self.radius) as f64
    }
}

/// Plate with a flat background.
pub fn uniform_plate(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Flat background with dark discs painted on it.
pub fn plate_with_discs(discs: &[Disc]) -> GrayImage {
    GrayImage::from_fn(PLATE_WIDTH, PLATE_HEIGHT, |x, y| {
        if discs.iter().any(|d| d.contains(x, y)) {
            Luma([COLONY])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Background brightening left to right (120 to 240) with discs at 30% of
/// the local background.
pub fn gradient_plate_with_discs(discs: &[Disc]) -> GrayImage {
    GrayImage::from_fn(PLATE_WIDTH, PLATE_HEIGHT, |x, y| {
        let background = 120.0 + 120.0 * x as f64 / (PLATE_WIDTH - 1) as f64;
        let value = if discs.iter().any(|d| d.contains(x, y)) {
            background * 0.3
        } else {
            background
        };
        Luma([value.round() as u8])
    })
}

/// Config sized to the synthetic plates so no resize happens.
pub fn plate_config(base: AnalysisConfig) -> AnalysisConfig {
    base.with_working_size(PLATE_WIDTH, PLATE_HEIGHT)
}

/// Write `img` to `path`, creating parent directories.
pub fn write_plate(path: &Path, img: &GrayImage) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create plate directory");
    }
    img.save(path).expect("Failed to save plate image");
}

pub fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= expected.abs() * rel_tol,
        "expected {} within {}%, got {}",
        expected,
        rel_tol * 100.0,
        actual
    );
}
