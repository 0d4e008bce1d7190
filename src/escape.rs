// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel.
//!
//! Take a point c on the complex plane, start z at zero, and
//! repeatedly replace z with z * z + c.  If z ever gets two or more
//! away from the origin it is gone for good; the number of steps it
//! took to get there is the "velocity" of the point, and is used
//! directly as the pixel's colour index.  Points that are still
//! inside after `maxit` steps are reported as `maxit`.

use num::Complex;

/// Count the iterations of z <- z * z + c, starting at z = 0, until
/// |z| >= 2 or the count reaches `maxit`.  The result is always in
/// `0..=maxit`, and any result below `maxit` is the exact step at which
/// the orbit left the radius-2 disc.
#[inline]
pub fn escape_time(c: Complex<f64>, maxit: u32) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    let mut it = 0;
    while z.norm_sqr() < 4.0 && it < maxit {
        z = z * z + c;
        it += 1;
    }
    it
}

/// `escape_time` for a point given as separate real and imaginary
/// parts.
#[inline]
pub fn escape_time_xy(x: f64, y: f64, maxit: u32) -> u32 {
    escape_time(Complex::new(x, y), maxit)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Walks the orbit by hand and returns |z|^2 after `steps` steps.
    fn orbit_norm_after(c: Complex<f64>, steps: u32) -> f64 {
        let mut z = Complex::new(0.0, 0.0);
        for _ in 0..steps {
            z = z * z + c;
        }
        z.norm_sqr()
    }

    #[test]
    fn origin_never_escapes() {
        for &maxit in &[1, 5, 127, 2000] {
            assert_eq!(escape_time_xy(0.0, 0.0, maxit), maxit);
        }
    }

    #[test]
    fn far_point_escapes_at_once() {
        assert_eq!(escape_time_xy(2.0, 2.0, 5), 1);
        assert!(escape_time_xy(2.0, 2.0, 127) < 5);
    }

    #[test]
    fn main_cardioid_is_inside() {
        assert_eq!(escape_time_xy(-0.5, 0.0, 500), 500);
        assert_eq!(escape_time_xy(-1.0, 0.0, 500), 500);
    }

    #[test]
    fn is_deterministic() {
        let c = Complex::new(-0.743_643_887, 0.131_825_904);
        assert_eq!(escape_time(c, 1000), escape_time(c, 1000));
    }

    #[test]
    fn results_are_bounded_and_exact() {
        let maxit = 60;
        for i in 0..40 {
            for j in 0..60 {
                let c = Complex::new(-2.0 + j as f64 * 0.05, -1.0 + i as f64 * 0.05);
                let n = escape_time(c, maxit);
                assert!(n <= maxit);
                if n < maxit {
                    assert!(orbit_norm_after(c, n) >= 4.0);
                    if n > 0 {
                        assert!(orbit_norm_after(c, n - 1) < 4.0);
                    }
                }
            }
        }
    }
}
