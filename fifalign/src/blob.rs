//! Coarse blob location: directional box blur, global maximum, fixed ROI.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{Image, Window};
use crate::peak::peak_in;

/// Rows handed to one rayon task.
const ROWS_PER_CHUNK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobLocatorConfig {
    /// Blur kernel extent along x. Must be odd.
    pub blur_width: usize,
    /// Blur kernel extent along y. Must be odd.
    pub blur_height: usize,
    /// Half-size of the square region cut around the maximum.
    pub roi_half_size: usize,
}

impl Default for BlobLocatorConfig {
    fn default() -> Self {
        Self {
            blur_width: 1,
            blur_height: 9,
            roi_half_size: 50,
        }
    }
}

impl BlobLocatorConfig {
    pub fn validate(&self) {
        assert!(
            self.blur_width % 2 == 1 && self.blur_height % 2 == 1,
            "blur kernel extents must be odd"
        );
        assert!(self.roi_half_size > 0, "roi_half_size must be positive");
    }
}

/// Region handed to the sub-pixel centroiders.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRoi {
    /// Maximum of the blurred image.
    pub anchor: (usize, usize),
    /// Region bounds in the input image.
    pub window: Window,
    pub sub_image: Image,
}

impl BlobRoi {
    #[inline]
    pub fn anchor_position(&self) -> DVec2 {
        DVec2::new(self.anchor.0 as f64, self.anchor.1 as f64)
    }

    /// Map a position in `sub_image` to the input image frame.
    #[inline]
    pub fn to_image_frame(&self, local: DVec2) -> DVec2 {
        local + DVec2::new(self.window.x0 as f64, self.window.y0 as f64)
    }
}

/// Blur, take the global maximum (first in row-major order) and cut out the
/// surrounding region, clipped to the image.
pub fn locate_blob(image: &Image, config: &BlobLocatorConfig) -> Result<BlobRoi> {
    config.validate();
    let (width, height) = image.shape();
    if image.is_empty() {
        return Err(Error::EmptyRegion {
            x: 0.0,
            y: 0.0,
            width,
            height,
        });
    }

    let blurred = box_blur(image, config.blur_width, config.blur_height);
    let full = Window {
        x0: 0,
        y0: 0,
        x1: width,
        y1: height,
    };
    let peak = peak_in(&blurred, &full);

    let half = config.roi_half_size;
    let window = Window::clipped(peak.position(), half, half, image)?;
    tracing::debug!(x = peak.x, y = peak.y, ?window, "blob located");

    Ok(BlobRoi {
        anchor: (peak.x, peak.y),
        window,
        sub_image: window.crop(image),
    })
}

/// Separable mean filter with edge samples replicated past the border.
pub fn box_blur(image: &Image, kernel_width: usize, kernel_height: usize) -> Image {
    let (width, height) = image.shape();
    if image.is_empty() {
        return image.clone();
    }
    let mut temp = vec![0.0; width * height];
    let rx = kernel_width / 2;
    let ry = kernel_height / 2;

    temp.par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in chunk.chunks_exact_mut(width).enumerate() {
                let in_row = image.row(y_start + local_y);
                for (x, out) in out_row.iter_mut().enumerate() {
                    let sum: f64 = (0..kernel_width)
                        .map(|k| in_row[clamped(x + k, rx, width)])
                        .sum();
                    *out = sum / kernel_width as f64;
                }
            }
        });

    let mut output = vec![0.0; width * height];
    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in chunk.chunks_exact_mut(width).enumerate() {
                let y = y_start + local_y;
                for (x, out) in out_row.iter_mut().enumerate() {
                    let sum: f64 = (0..kernel_height)
                        .map(|k| temp[clamped(y + k, ry, height) * width + x])
                        .sum();
                    *out = sum / kernel_height as f64;
                }
            }
        });

    Image::new(width, height, output)
}

/// `i - radius` clamped to `[0, len)`. `i` already includes the `+ radius`
/// kernel offset, so it never underflows.
#[inline]
fn clamped(i: usize, radius: usize, len: usize) -> usize {
    i.saturating_sub(radius).min(len - 1)
}
