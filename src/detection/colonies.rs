use tracing::{debug, trace};

use crate::models::{Colony, Contour};

/// Result of size-filtering a set of contours.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Accepted boundaries (convex hulls when smoothing), in discovery order.
    pub accepted: Vec<Contour>,
    pub count: usize,
    /// Mean accepted area in µm², 0 when nothing was accepted.
    pub avg_area: f64,
    /// Accepted areas in µm², paired index-for-index with `accepted`.
    pub areas: Vec<f64>,
}

impl FilterOutcome {
    pub fn from_colonies(colonies: Vec<Colony>) -> Self {
        let count = colonies.len();
        let (accepted, areas): (Vec<Contour>, Vec<f64>) =
            colonies.into_iter().map(|c| (c.contour, c.area_um2)).unzip();
        let avg_area = if count > 0 {
            areas.iter().sum::<f64>() / count as f64
        } else {
            0.0
        };
        Self {
            accepted,
            count,
            avg_area,
            areas,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Area of a contour in µm² given the microns-per-pixel scale.
pub fn area_um2(contour: &Contour, scale: f64) -> f64 {
    round2(contour.pixel_area()) * scale * scale
}

/// Keep contours strictly larger than `min_size_um2`.
///
/// With `smoothing`, each accepted contour is replaced by its convex hull and
/// measured again from the hull.
pub fn filter_colonies(contours: &[Contour], scale: f64, min_size_um2: f64, smoothing: bool) -> Vec<Colony> {
    let mut colonies = Vec::new();

    for contour in contours {
        let area = area_um2(contour, scale);
        if area <= min_size_um2 {
            trace!(area, points = contour.len(), "rejected contour below size threshold");
            continue;
        }

        let colony = if smoothing {
            let hull = contour.convex_hull();
            let hull_area = area_um2(&hull, scale);
            Colony {
                contour: hull,
                area_um2: hull_area,
            }
        } else {
            Colony {
                contour: contour.clone(),
                area_um2: area,
            }
        };

        trace!(area = colony.area_um2, bounds = ?colony.contour.bounds(), "accepted colony");
        colonies.push(colony);
    }

    debug!(
        contours = contours.len(),
        accepted = colonies.len(),
        min_size_um2,
        smoothing,
        "size filter done"
    );
    colonies
}

pub fn filter(contours: &[Contour], scale: f64, min_size_um2: f64, smoothing: bool) -> FilterOutcome {
    FilterOutcome::from_colonies(filter_colonies(contours, scale, min_size_um2, smoothing))
}
