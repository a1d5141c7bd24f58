//! Brightest pixel inside a square search window.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{Image, Window};

/// How a search window that crosses the image edge is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Clip the window to the image.
    #[default]
    Clamp,
    /// Refuse windows that do not fit entirely inside the image.
    Reject,
}

/// Integer location and value of the brightest pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

impl Peak {
    #[inline]
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x as f64, self.y as f64)
    }
}

/// Maximum pixel in `[x - r, x + r] × [y - r, y + r]` around the rounded guess.
///
/// Ties resolve to the first pixel in row-major order. A zero radius is an
/// empty window.
pub fn find_peak(image: &Image, guess: DVec2, radius: usize, policy: BoundsPolicy) -> Result<Peak> {
    if radius == 0 {
        let (width, height) = image.shape();
        return Err(Error::EmptyRegion {
            x: guess.x,
            y: guess.y,
            width,
            height,
        });
    }
    let window = match policy {
        BoundsPolicy::Clamp => Window::clipped(guess, radius, radius, image)?,
        BoundsPolicy::Reject => Window::strict(
            guess.x.round() as i64,
            guess.y.round() as i64,
            radius,
            image,
        )?,
    };
    Ok(peak_in(image, &window))
}

/// Maximum pixel of a window already known to be non-empty.
pub(crate) fn peak_in(image: &Image, window: &Window) -> Peak {
    let mut best = Peak {
        x: window.x0,
        y: window.y0,
        value: image[(window.x0, window.y0)],
    };
    for y in window.y_range() {
        let row = &image.row(y)[window.x_range()];
        for (dx, &value) in row.iter().enumerate() {
            if value > best.value {
                best = Peak {
                    x: window.x0 + dx,
                    y,
                    value,
                };
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(points: &[(usize, usize, f64)]) -> Image {
        let mut image = Image::new_filled(12, 10, 1.0);
        for &(x, y, v) in points {
            image[(x, y)] = v;
        }
        image
    }

    #[test]
    fn test_finds_peak_in_window() {
        let image = image_with(&[(6, 4, 9.0), (1, 1, 20.0)]);
        let peak = find_peak(&image, DVec2::new(5.0, 5.0), 2, BoundsPolicy::Clamp).unwrap();
        assert_eq!(peak, Peak { x: 6, y: 4, value: 9.0 });
        assert_eq!(peak.position(), DVec2::new(6.0, 4.0));
    }

    #[test]
    fn test_ties_resolve_row_major() {
        let image = image_with(&[(7, 5, 9.0), (4, 6, 9.0), (5, 5, 9.0)]);
        let peak = find_peak(&image, DVec2::new(5.0, 5.0), 2, BoundsPolicy::Clamp).unwrap();
        assert_eq!((peak.x, peak.y), (5, 5));
    }

    #[test]
    fn test_clamp_policy_clips_at_edge() {
        let image = image_with(&[(0, 0, 5.0)]);
        let peak = find_peak(&image, DVec2::new(1.0, 1.0), 3, BoundsPolicy::Clamp).unwrap();
        assert_eq!((peak.x, peak.y), (0, 0));
    }

    #[test]
    fn test_clamp_policy_empty_window() {
        let image = image_with(&[]);
        let err = find_peak(&image, DVec2::new(50.0, 5.0), 2, BoundsPolicy::Clamp).unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
    }

    #[test]
    fn test_radius_zero_is_empty() {
        let image = image_with(&[(5, 5, 9.0)]);
        for policy in [BoundsPolicy::Clamp, BoundsPolicy::Reject] {
            let err = find_peak(&image, DVec2::new(5.0, 5.0), 0, policy).unwrap_err();
            assert!(matches!(err, Error::EmptyRegion { width: 12, height: 10, .. }));
        }
    }

    #[test]
    fn test_reject_policy_refuses_edge_window() {
        let image = image_with(&[(1, 1, 5.0)]);
        let err = find_peak(&image, DVec2::new(1.0, 5.0), 3, BoundsPolicy::Reject).unwrap_err();
        assert!(matches!(err, Error::RegionOutOfBounds { .. }));
        assert!(err.is_out_of_bounds());
        assert!(find_peak(&image, DVec2::new(5.0, 5.0), 3, BoundsPolicy::Reject).is_ok());
    }
}
