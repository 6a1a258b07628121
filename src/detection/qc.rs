use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::models::Contour;

/// Colors and stroke used for QC overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QcStyle {
    pub stroke_width: u32,
    pub contour_color: Rgb<u8>,
    pub gauge_color: Rgb<u8>,
}

impl Default for QcStyle {
    fn default() -> Self {
        Self {
            stroke_width: 3,
            contour_color: Rgb([0, 255, 255]),
            gauge_color: Rgb([255, 255, 255]),
        }
    }
}

impl QcStyle {
    fn pen_offsets(&self) -> Vec<(i32, i32)> {
        let half = (self.stroke_width.max(1) / 2) as i32;
        (-half..=half)
            .flat_map(|dy| (-half..=half).map(move |dx| (dx, dy)))
            .collect()
    }
}

/// Radius in pixels of a circle whose area equals `min_size_um2`.
pub fn gauge_radius_px(min_size_um2: f64, scale: f64) -> i32 {
    ((min_size_um2 / std::f64::consts::PI).sqrt() / scale) as i32
}

/// Draw accepted contours and the minimum-size gauge over a copy of `base`.
pub fn render(
    base: &GrayImage,
    contours: &[Contour],
    min_size_um2: f64,
    scale: f64,
    style: &QcStyle,
) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(base.clone()).to_rgb8();
    let pen = style.pen_offsets();

    for contour in contours {
        draw_closed_outline(&mut canvas, contour, &pen, style.contour_color);
    }

    let radius = gauge_radius_px(min_size_um2, scale);
    if radius > 0 {
        for &(dx, dy) in &pen {
            draw_hollow_circle_mut(&mut canvas, (radius + dx, radius + dy), radius, style.gauge_color);
        }
    }

    canvas
}

fn draw_closed_outline(canvas: &mut RgbImage, contour: &Contour, pen: &[(i32, i32)], color: Rgb<u8>) {
    let points = &contour.points;
    let n = points.len();
    if n == 0 {
        return;
    }

    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        for &(dx, dy) in pen {
            draw_line_segment_mut(
                canvas,
                ((p1.x + dx) as f32, (p1.y + dy) as f32),
                ((p2.x + dx) as f32, (p2.y + dy) as f32),
                color,
            );
        }
    }
}
