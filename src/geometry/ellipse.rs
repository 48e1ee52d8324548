//! Nearest point on an axis-aligned ellipse.
//!
//! Solves the distance equation by bisection on its single root, following
//! Eberly, "Distance from a Point to an Ellipse, an Ellipsoid, or a
//! Hyperellipsoid". The cone constraint uses it to pull a swing direction
//! back onto the boundary of its elliptical limit.

/// Upper bound on bisection steps. Bisection stops earlier once the bracket
/// collapses to adjacent floating point values.
pub const MAX_BISECTION_ITERATIONS: usize = 149;

/// Closest point on the ellipse `(x/e0)^2 + (y/e1)^2 = 1` to `(y0, y1)`.
///
/// Works for any quadrant and either radius ordering; the radii are swapped
/// internally so the larger one comes first.
pub fn closest_point_on_ellipse(e0: f64, e1: f64, y0: f64, y1: f64) -> (f64, f64) {
    if e0 < e1 {
        let (x1, x0) = closest_point_on_ellipse(e1, e0, y1, y0);
        return (x0, x1);
    }
    let (x0, x1) = closest_point_first_quadrant(e0, e1, y0.abs(), y1.abs());
    (x0.copysign(y0), x1.copysign(y1))
}

/// Implicit value `(x/e0)^2 + (y/e1)^2 - 1`: negative inside, positive outside.
#[inline]
pub fn ellipse_implicit(e0: f64, e1: f64, x: f64, y: f64) -> f64 {
    (x / e0).powi(2) + (y / e1).powi(2) - 1.0
}

/// Requires `e0 >= e1 >= 0`, `y0 >= 0`, `y1 >= 0`.
fn closest_point_first_quadrant(e0: f64, e1: f64, y0: f64, y1: f64) -> (f64, f64) {
    if e1 <= 0.0 {
        // Collapsed to the segment [-e0, e0].
        return (y0.min(e0), 0.0);
    }
    if y1 > 0.0 {
        if y0 > 0.0 {
            let z0 = y0 / e0;
            let z1 = y1 / e1;
            let g = z0 * z0 + z1 * z1 - 1.0;
            if g != 0.0 {
                let r0 = (e0 / e1).powi(2);
                let s = bisect_root(r0, z0, z1, g);
                (r0 * y0 / (s + r0), y1 / (s + 1.0))
            } else {
                (y0, y1)
            }
        } else {
            (0.0, e1)
        }
    } else {
        let numer0 = e0 * y0;
        let denom0 = e0 * e0 - e1 * e1;
        if numer0 < denom0 {
            let xde0 = numer0 / denom0;
            (e0 * xde0, e1 * (1.0 - xde0 * xde0).max(0.0).sqrt())
        } else {
            (e0, 0.0)
        }
    }
}

fn bisect_root(r0: f64, z0: f64, z1: f64, g: f64) -> f64 {
    let n0 = r0 * z0;
    let mut s0 = z1 - 1.0;
    let mut s1 = if g < 0.0 { 0.0 } else { n0.hypot(z1) - 1.0 };
    let mut s = 0.0;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        s = 0.5 * (s0 + s1);
        if s == s0 || s == s1 {
            break;
        }
        let ratio0 = n0 / (s + r0);
        let ratio1 = z1 / (s + 1.0);
        let g = ratio0 * ratio0 + ratio1 * ratio1 - 1.0;
        if g > 0.0 {
            s0 = s;
        } else if g < 0.0 {
            s1 = s;
        } else {
            break;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_on_major_axis() {
        let (x, y) = closest_point_on_ellipse(2.0, 1.0, 3.0, 0.0);
        assert_relative_eq!(x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_on_minor_axis() {
        let (x, y) = closest_point_on_ellipse(2.0, 1.0, 0.0, -3.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_result_lies_on_ellipse_in_every_quadrant() {
        for &(px, py) in &[(1.5, 1.2), (-1.5, 1.2), (-0.4, -2.0), (3.0, -0.1)] {
            let (x, y) = closest_point_on_ellipse(1.0, 0.5, px, py);
            assert_relative_eq!(ellipse_implicit(1.0, 0.5, x, y), 0.0, epsilon = 1e-9);
            assert_eq!(x.signum(), px.signum());
            assert_eq!(y.signum(), py.signum());
        }
    }

    #[test]
    fn test_swapped_radii_match() {
        let (x, y) = closest_point_on_ellipse(0.5, 1.0, 1.2, 1.5);
        let (y_swapped, x_swapped) = closest_point_on_ellipse(1.0, 0.5, 1.5, 1.2);
        assert_relative_eq!(x, x_swapped, epsilon = 1e-12);
        assert_relative_eq!(y, y_swapped, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_beats_sampled_boundary() {
        let (e0, e1) = (1.3, 0.4);
        let (px, py) = (1.1, 0.9);
        let (x, y) = closest_point_on_ellipse(e0, e1, px, py);
        let best = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
        for i in 0..720 {
            let t = i as f64 * std::f64::consts::PI / 360.0;
            let d = ((e0 * t.cos() - px).powi(2) + (e1 * t.sin() - py).powi(2)).sqrt();
            assert!(best <= d + 1e-9);
        }
    }
}
