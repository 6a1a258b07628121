use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::models::Contour;

/// Outer boundaries of every connected foreground region in a binary mask.
///
/// Holes, and anything nested inside a hole, are not reported. Contours come
/// back in border-following scan order.
pub fn find_outer_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}
