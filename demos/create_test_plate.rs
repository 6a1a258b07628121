use image::{GrayImage, Luma};

/// Dark colonies as (x, y, radius) on a 1500x1000 plate.
const COLONIES: [(i32, i32, i32); 6] = [
    (250, 300, 30),
    (600, 250, 22),
    (900, 700, 40),
    (1200, 400, 18),
    (400, 750, 26),
    (1300, 850, 12),
];

fn main() {
    let (width, height) = (1500u32, 1000u32);
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);

    // Vignetted background: brightest in the middle, darker towards the rim.
    let img = GrayImage::from_fn(width, height, |x, y| {
        let dx = (x as f64 - cx) / cx;
        let dy = (y as f64 - cy) / cy;
        let background = 220.0 - 70.0 * (dx * dx + dy * dy) / 2.0;

        let inside = COLONIES.iter().any(|&(px, py, r)| {
            let ddx = x as i32 - px;
            let ddy = y as i32 - py;
            ddx * ddx + ddy * ddy <= r * r
        });
        let value = if inside { background * 0.3 } else { background };
        Luma([value.round() as u8])
    });

    img.save("test_plate.jpg").unwrap();
    println!(
        "Created test_plate.jpg ({}x{} plate, {} colonies)",
        width,
        height,
        COLONIES.len()
    );
}
