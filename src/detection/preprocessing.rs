use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::median_filter;

use crate::error::{AnalysisError, Result};

const CELL_EPSILON: f64 = 1e-9;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Resize to the pipeline's working resolution (bilinear).
pub fn resize_to_working(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Coarse estimate of the local background brightness.
#[derive(Debug, Clone)]
pub struct GradientMap {
    map: GrayImage,
    resolution: f64,
}

impl GradientMap {
    pub fn width(&self) -> u32 {
        self.map.width()
    }

    pub fn height(&self) -> u32 {
        self.map.height()
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.map
    }

    /// Cell holding full-resolution pixel `(col, row)`: `(floor(col·g), floor(row·g))`.
    pub fn cell_of(&self, col: u32, row: u32) -> (u32, u32) {
        (
            cell_index(col, self.resolution, self.map.width()),
            cell_index(row, self.resolution, self.map.height()),
        )
    }

    /// Background estimate for full-resolution pixel `(col, row)`.
    pub fn value_at(&self, col: u32, row: u32) -> u8 {
        let (cx, cy) = self.cell_of(col, row);
        self.map.get_pixel(cx, cy)[0]
    }
}

fn cell_index(pos: u32, resolution: f64, cells: u32) -> u32 {
    ((pos as f64 * resolution).floor() as u32).min(cells - 1)
}

/// Number of gradient cells covering `len` pixels; every `floor(i·g)` for
/// `i < len` is a valid index.
fn cell_count(len: u32, resolution: f64) -> u32 {
    ((len as f64 * resolution - CELL_EPSILON).ceil() as u32).max(1)
}

/// Build the gradient map: area-weighted downsample by `resolution`, then a
/// median filter of radius `median_radius` to drop colony-sized outliers.
pub fn gradient_map(img: &GrayImage, resolution: f64, median_radius: u32) -> Result<GradientMap> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(AnalysisError::EmptyImage);
    }
    if !(resolution > 0.0 && resolution <= 1.0) {
        return Err(AnalysisError::invalid(
            "gradient_resolution",
            format!("must be in (0, 1], got {}", resolution),
        ));
    }
    if (width as f64) * resolution < 1.0 || (height as f64) * resolution < 1.0 {
        return Err(AnalysisError::ImageTooSmall {
            width,
            height,
            resolution,
        });
    }

    let coarse = area_downsample(img, resolution);
    let map = if median_radius > 0 {
        median_filter(&coarse, median_radius, median_radius)
    } else {
        coarse
    };

    Ok(GradientMap { map, resolution })
}

/// Source pixels (and their fractional overlap) feeding each coarse cell.
fn axis_weights(src_len: u32, resolution: f64) -> Vec<Vec<(u32, f64)>> {
    let cells = cell_count(src_len, resolution);
    let cell_size = 1.0 / resolution;
    let limit = src_len as f64;

    (0..cells)
        .map(|i| {
            let start = (i as f64 * cell_size).min(limit);
            let end = ((i + 1) as f64 * cell_size).min(limit);
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);

            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > CELL_EPSILON).then_some((s, overlap))
                })
                .collect()
        })
        .collect()
}

fn area_downsample(img: &GrayImage, resolution: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let x_weights = axis_weights(width, resolution);
    let y_weights = axis_weights(height, resolution);

    GrayImage::from_fn(x_weights.len() as u32, y_weights.len() as u32, |cx, cy| {
        let mut sum = 0.0;
        let mut total = 0.0;
        for &(sy, wy) in &y_weights[cy as usize] {
            for &(sx, wx) in &x_weights[cx as usize] {
                let w = wx * wy;
                sum += img.get_pixel(sx, sy)[0] as f64 * w;
                total += w;
            }
        }
        let mean = if total > 0.0 { sum / total } else { 0.0 };
        Luma([mean.round().clamp(0.0, 255.0) as u8])
    })
}

/// Classify every pixel against its local background.
///
/// A pixel is background (0) when brighter than `gradient × multiplier`,
/// otherwise candidate colony (255). Cells whose threshold falls below one
/// intensity level are treated as background outright.
pub fn binarize(img: &GrayImage, gradient: &GradientMap, significance_multiplier: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let col_cells: Vec<u32> = (0..width)
        .map(|c| cell_index(c, gradient.resolution, gradient.width()))
        .collect();
    let row_cells: Vec<u32> = (0..height)
        .map(|r| cell_index(r, gradient.resolution, gradient.height()))
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let background = gradient.map.get_pixel(col_cells[x as usize], row_cells[y as usize])[0];
        let sig_thresh = background as f64 * significance_multiplier;
        let intensity = img.get_pixel(x, y)[0] as f64;

        if sig_thresh < 1.0 || intensity > sig_thresh {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

/// Gradient correction: background estimate followed by binarization.
pub fn correct(
    img: &GrayImage,
    resolution: f64,
    median_radius: u32,
    significance_multiplier: f64,
) -> Result<(GradientMap, GrayImage)> {
    let gradient = gradient_map(img, resolution, median_radius)?;
    let mask = binarize(img, &gradient, significance_multiplier);
    Ok((gradient, mask))
}

/// Union of a mask with an edge map (saturating add).
pub fn union_with_edges(mask: &GrayImage, edges: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for (o, e) in out.pixels_mut().zip(edges.pixels()) {
        o[0] = o[0].saturating_add(e[0]);
    }
    out
}
