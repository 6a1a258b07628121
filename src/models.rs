use image::RgbImage;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

/// Closed outer boundary of one connected foreground region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed polygon area in pixel² (shoelace formula), orientation ignored.
    pub fn pixel_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let mut twice_area: i64 = 0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    /// Convex hull of the boundary points.
    pub fn convex_hull(&self) -> Contour {
        if self.points.len() < 3 {
            return self.clone();
        }
        Contour::new(convex_hull(self.points.as_slice()))
    }

    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }
}

/// A contour accepted by the size filter, with its area in µm².
#[derive(Debug, Clone)]
pub struct Colony {
    pub contour: Contour,
    pub area_um2: f64,
}

/// Outcome of analysing one image.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub count: usize,
    /// Mean colony area in µm², 0 when nothing was accepted.
    pub avg_area: f64,
    /// Accepted areas in contour discovery order.
    pub areas: Vec<f64>,
    /// Accepted boundaries (hulls when smoothing is on), paired with `areas`.
    pub accepted: Vec<Contour>,
    pub qc_image: RgbImage,
}

impl AnalysisResult {
    pub fn sum_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Population standard deviation of `areas`; 0 for an empty list.
    pub fn std_dev(&self) -> f64 {
        population_std_dev(&self.areas)
    }
}

pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
