// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Params struct, which describes a relationship between
//! a rectangle on the integral plane with an origin at 0,0 (the pixel
//! grid), and a rectangle on the complex plane bounded by an
//! arbitrary leftlower and rightupper corner (the viewport).
//!
//! A Params is built once, on the coordinator, shipped to every
//! participant, and never changed afterward.
use num::Complex;

use crate::error::{Error, Result};

/// The bounds of the region of the complex plane being rendered.  The
/// real axis runs from xmin to xmax, the imaginary from ymin to ymax.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Left edge, on the real axis.
    pub xmin: f64,
    /// Right edge, on the real axis.
    pub xmax: f64,
    /// Lower edge, on the imaginary axis.
    pub ymin: f64,
    /// Upper edge, on the imaginary axis.
    pub ymax: f64,
}

impl Viewport {
    /// Constructor.  Takes the two corners of the region and refuses
    /// any region that is empty, inverted, or not finite.
    pub fn new(leftlower: Complex<f64>, rightupper: Complex<f64>) -> Result<Viewport> {
        Viewport::from_bounds(leftlower.re, rightupper.re, leftlower.im, rightupper.im)
    }

    /// Same as `new`, from the four bounds in wire order.
    pub fn from_bounds(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Viewport> {
        let viewport = Viewport {
            xmin,
            xmax,
            ymin,
            ymax,
        };
        viewport.validate()?;
        Ok(viewport)
    }

    /// Checks xmin < xmax and ymin < ymax, with every bound finite.
    pub fn validate(&self) -> Result<()> {
        if ![self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::InvalidViewport(
                "every bound must be a finite number".to_string(),
            ));
        }

        if self.xmax <= self.xmin {
            return Err(Error::InvalidViewport(
                "The left lower corner is not to the left of the right upper corner.".to_string(),
            ));
        }

        if self.ymax <= self.ymin {
            return Err(Error::InvalidViewport(
                "The left lower corner is not lower than the right upper corner".to_string(),
            ));
        }
        Ok(())
    }

    /// The four bounds as they travel over the wire.
    pub fn to_array(&self) -> [f64; 4] {
        [self.xmin, self.xmax, self.ymin, self.ymax]
    }
}

/// Describes the width and height of the pixel grid, plus the
/// iteration cap each pixel is computed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    /// Columns, W.
    pub width: usize,
    /// Rows, H.
    pub height: usize,
    /// Iteration cap, also the largest value a pixel may hold.
    pub maxit: u32,
}

impl Grid {
    /// Constructor.  Zero in any position is refused, as is a size that
    /// cannot be described by the 32-bit counts used on the wire.
    pub fn new(width: usize, height: usize, maxit: u32) -> Result<Grid> {
        let grid = Grid {
            width,
            height,
            maxit,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Checks W > 0, H > 0, maxit > 0.
    pub fn validate(&self) -> Result<()> {
        let fits = self
            .width
            .checked_mul(self.height)
            .map_or(false, |n| n <= u32::max_value() as usize);
        if self.width == 0 || self.height == 0 || self.maxit == 0 || !fits {
            return Err(Error::InvalidGrid {
                width: self.width,
                height: self.height,
                maxit: self.maxit,
            });
        }
        Ok(())
    }

    /// The total number of pixels.  Used to size buffers.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Describes that the grid has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Everything a participant needs to compute its share of the image:
/// the viewport, the grid, and the per-pixel steps derived from them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Params {
    /// Region of the complex plane.
    pub viewport: Viewport,
    /// Pixel grid and iteration cap.
    pub grid: Grid,
    // Width and height of one pixel on the complex plane.
    deltas: (f64, f64),
}

impl Params {
    /// Builds the configuration and derives dx = (xmax-xmin)/W and
    /// dy = (ymax-ymin)/H.  Every participant computes the deltas for
    /// itself from the same broadcast values, so they agree bit for bit.
    pub fn new(viewport: Viewport, grid: Grid) -> Result<Params> {
        viewport.validate()?;
        grid.validate()?;
        let deltas = (
            (viewport.xmax - viewport.xmin) / (grid.width as f64),
            (viewport.ymax - viewport.ymin) / (grid.height as f64),
        );
        Ok(Params {
            viewport,
            grid,
            deltas,
        })
    }

    /// Horizontal size of one pixel.
    pub fn dx(&self) -> f64 {
        self.deltas.0
    }

    /// Vertical size of one pixel.
    pub fn dy(&self) -> f64 {
        self.deltas.1
    }

    /// Real coordinate of column `col`.
    pub fn x_at(&self, col: usize) -> f64 {
        self.viewport.xmin + (col as f64) * self.deltas.0
    }

    /// Imaginary coordinate of row `row`.
    pub fn y_at(&self, row: usize) -> f64 {
        self.viewport.ymin + (row as f64) * self.deltas.1
    }

    /// Given the row and column of a pixel, return the point on the
    /// complex plane it samples.
    pub fn pixel_to_point(&self, row: usize, col: usize) -> Complex<f64> {
        Complex::new(self.x_at(col), self.y_at(row))
    }
}

impl Default for Params {
    /// The classic full view: [-2, 1] x [-1, 1] at 150x100, 127
    /// iterations.
    fn default() -> Self {
        Params {
            viewport: Viewport {
                xmin: -2.0,
                xmax: 1.0,
                ymin: -1.0,
                ymax: 1.0,
            },
            grid: Grid {
                width: 150,
                height: 100,
                maxit: 127,
            },
            deltas: (3.0 / 150.0, 2.0 / 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_fails_on_bad_shape() {
        let vp = Viewport::new(Complex::new(-1.0, 1.0), Complex::new(1.0, -1.0));
        assert!(vp.is_err());
        let vp = Viewport::new(Complex::new(1.0, -1.0), Complex::new(-1.0, 1.0));
        assert!(vp.is_err());
    }

    #[test]
    fn viewport_fails_when_flat() {
        let vp = Viewport::from_bounds(0.0, 0.0, -1.0, 1.0);
        assert!(vp.is_err());
    }

    #[test]
    fn viewport_fails_on_nan() {
        let vp = Viewport::from_bounds(std::f64::NAN, 1.0, -1.0, 1.0);
        assert!(vp.is_err());
    }

    #[test]
    fn viewport_passes_on_good_shape() {
        let vp = Viewport::new(Complex::new(-1.0, -1.0), Complex::new(1.0, 1.0));
        assert!(vp.is_ok());
    }

    #[test]
    fn grid_refuses_zero() {
        assert!(Grid::new(0, 10, 10).is_err());
        assert!(Grid::new(10, 0, 10).is_err());
        assert!(Grid::new(10, 10, 0).is_err());
        assert!(Grid::new(1, 1, 1).is_ok());
    }

    #[test]
    fn default_matches_derived_deltas() {
        let d = Params::default();
        let p = Params::new(d.viewport, d.grid).unwrap();
        assert_eq!(d, p);
    }

    #[test]
    fn pixel_to_point_on_positive_planes() {
        let vp = Viewport::from_bounds(0.0, 5.0, 0.0, 5.0).unwrap();
        let p = Params::new(vp, Grid::new(5, 5, 10).unwrap()).unwrap();
        assert_eq!(p.pixel_to_point(0, 0), Complex::new(0.0, 0.0));
        assert_eq!(p.pixel_to_point(2, 2), Complex::new(2.0, 2.0));
        assert_eq!(p.pixel_to_point(4, 1), Complex::new(1.0, 4.0));
    }

    #[test]
    fn pixel_to_point_on_mixed_planes() {
        let vp = Viewport::from_bounds(-2.0, 2.0, -2.0, 2.0).unwrap();
        let p = Params::new(vp, Grid::new(4, 4, 10).unwrap()).unwrap();
        assert_eq!(p.dx(), 1.0);
        assert_eq!(p.dy(), 1.0);
        assert_eq!(p.pixel_to_point(2, 2), Complex::new(0.0, 0.0));
        assert_eq!(p.pixel_to_point(0, 0), Complex::new(-2.0, -2.0));
    }
}
