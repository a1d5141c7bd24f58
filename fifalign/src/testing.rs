//! Synthetic image generators shared by unit tests.

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image::Image;

/// Circular Gaussian spot on a flat background.
pub fn gaussian_blob(
    width: usize,
    height: usize,
    center: DVec2,
    sigma: f64,
    amplitude: f64,
    background: f64,
) -> Image {
    let inv_2sigma2 = 0.5 / (sigma * sigma);
    let mut image = Image::new_filled(width, height, background);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;
            image[(x, y)] += amplitude * (-(dx * dx + dy * dy) * inv_2sigma2).exp();
        }
    }
    image
}

/// Flat-topped rectangular spot whose edges roll off as `tanh` over
/// `edge_width` pixels. `half_size` is measured to the half-intensity edge.
pub fn soft_box(
    width: usize,
    height: usize,
    center: DVec2,
    half_size: DVec2,
    edge_width: f64,
    amplitude: f64,
    background: f64,
) -> Image {
    let plateau = |d: f64, half: f64| {
        0.5 * (((d + half) / edge_width).tanh() - ((d - half) / edge_width).tanh())
    };
    let mut image = Image::new_filled(width, height, background);
    for y in 0..height {
        let wy = plateau(y as f64 - center.y, half_size.y);
        for x in 0..width {
            let wx = plateau(x as f64 - center.x, half_size.x);
            image[(x, y)] += amplitude * wx * wy;
        }
    }
    image
}

/// Add uniform noise in `[-amplitude, amplitude)` from a seeded generator.
pub fn add_noise(image: &mut Image, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in image.iter_mut() {
        *p += rng.random_range(-amplitude..amplitude);
    }
}
