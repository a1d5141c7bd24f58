//! Image type and axis-aligned windows into it.

use std::ops::Range;

use common::Buffer2;
use glam::DVec2;

use crate::axis::Axis;
use crate::error::{Error, Result};

/// Real-valued intensity image, row-major, `(x, y)` = `(column, row)`.
pub type Image = Buffer2<f64>;

/// Convert raw sensor counts to a real-valued image.
pub fn image_from_u16(raw: &Buffer2<u16>) -> Image {
    raw.map(|&v| v as f64)
}

/// Axis-aligned window `[x0, x1) × [y0, y1)` in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Window {
    /// Window of half-widths `half` centered on the rounded `center`,
    /// clipped to the image. Errors when nothing is left after clipping.
    pub fn clipped(center: DVec2, half_x: usize, half_y: usize, image: &Image) -> Result<Self> {
        let (width, height) = image.shape();
        let empty = || Error::EmptyRegion {
            x: center.x,
            y: center.y,
            width,
            height,
        };
        if !center.is_finite() {
            return Err(empty());
        }

        let cx = center.x.round() as i64;
        let cy = center.y.round() as i64;
        let x0 = (cx - half_x as i64).max(0);
        let y0 = (cy - half_y as i64).max(0);
        let x1 = (cx + half_x as i64 + 1).min(width as i64);
        let y1 = (cy + half_y as i64 + 1).min(height as i64);

        if x1 <= x0 || y1 <= y0 {
            return Err(empty());
        }

        Ok(Self {
            x0: x0 as usize,
            y0: y0 as usize,
            x1: x1 as usize,
            y1: y1 as usize,
        })
    }

    /// Square window of half-size `half` around integer `(cx, cy)`.
    /// Any part outside the image is an error rather than being clipped.
    pub fn strict(cx: i64, cy: i64, half: usize, image: &Image) -> Result<Self> {
        let (width, height) = image.shape();
        let h = half as i64;
        if cx - h < 0 || cy - h < 0 || cx + h > width as i64 - 1 || cy + h > height as i64 - 1 {
            return Err(Error::RegionOutOfBounds {
                x: cx,
                y: cy,
                half_size: half,
                width,
                height,
            });
        }
        Ok(Self {
            x0: (cx - h) as usize,
            y0: (cy - h) as usize,
            x1: (cx + h + 1) as usize,
            y1: (cy + h + 1) as usize,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    #[inline]
    pub fn x_range(&self) -> Range<usize> {
        self.x0..self.x1
    }

    #[inline]
    pub fn y_range(&self) -> Range<usize> {
        self.y0..self.y1
    }

    /// Extent along `axis`.
    #[inline]
    pub fn len(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.width(),
            Axis::Y => self.height(),
        }
    }

    /// Image coordinate of the first sample along `axis`.
    #[inline]
    pub fn origin(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x0,
            Axis::Y => self.y0,
        }
    }

    /// Copy of the windowed pixels.
    pub fn crop(&self, image: &Image) -> Image {
        image.crop(self.x_range(), self.y_range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: usize, height: usize) -> Image {
        Image::new_filled(width, height, 0.0)
    }

    #[test]
    fn test_clipped_window_inside_image() {
        let image = blank(20, 10);
        let w = Window::clipped(DVec2::new(10.2, 4.6), 3, 2, &image).unwrap();
        assert_eq!((w.x0, w.x1, w.y0, w.y1), (7, 14, 3, 8));
        assert_eq!(w.len(Axis::X), 7);
        assert_eq!(w.len(Axis::Y), 5);
    }

    #[test]
    fn test_clipped_window_at_corner() {
        let image = blank(20, 10);
        let w = Window::clipped(DVec2::new(0.0, 9.0), 3, 3, &image).unwrap();
        assert_eq!((w.x0, w.x1, w.y0, w.y1), (0, 4, 6, 10));
    }

    #[test]
    fn test_clipped_window_outside_image_is_empty() {
        let image = blank(20, 10);
        let err = Window::clipped(DVec2::new(40.0, 5.0), 3, 3, &image).unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
        let err = Window::clipped(DVec2::new(f64::NAN, 5.0), 3, 3, &image).unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
    }

    #[test]
    fn test_strict_window_rejects_edge() {
        let image = blank(20, 10);
        assert!(Window::strict(5, 5, 4, &image).is_ok());
        let err = Window::strict(5, 6, 4, &image).unwrap_err();
        assert!(matches!(err, Error::RegionOutOfBounds { half_size: 4, .. }));
        assert!(Window::strict(3, 5, 4, &image).is_err());
    }

    #[test]
    fn test_crop_reads_window() {
        let image = Image::new(4, 3, (0..12).map(|v| v as f64).collect());
        let w = Window::clipped(DVec2::new(2.0, 1.0), 1, 1, &image).unwrap();
        let sub = w.crop(&image);
        assert_eq!(sub.pixels(), &[1.0, 2.0, 3.0, 5.0, 6.0, 7.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_u16_conversion() {
        let raw = Buffer2::new(2, 1, vec![3u16, 65535]);
        assert_eq!(image_from_u16(&raw).pixels(), &[3.0, 65535.0]);
    }
}
