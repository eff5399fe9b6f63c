use tracing::{debug, trace};

use super::Point;

const MAX_ITERATIONS: usize = 10;
const CONVERGED: f64 = 1e-10;
const DEGENERATE_JACOBIAN: f64 = 1e-12;

/// Corner order used by [`BilinearQuad`] and by the `MMPXY`/`MMPLL` records
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[allow(missing_docs)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

/// Two quadrilaterals whose corners correspond one to one.
///
/// Both sides are given in [`Corner`] order (top-left, top-right, bottom-right, bottom-left).
/// The order is not checked against the coordinates: a quad listed in any other order maps
/// to the wrong place.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BilinearQuad {
    /// Source corners, expected to be axis-aligned (pixels)
    pub src: [Point; 4],
    /// Destination corners
    pub dst: [Point; 4],
}

fn blend(corners: &[Point; 4], u: f64, v: f64) -> Point {
    let [tl, tr, br, bl] = *corners;
    let w_tl = (1.0 - u) * (1.0 - v);
    let w_tr = u * (1.0 - v);
    let w_bl = (1.0 - u) * v;
    let w_br = u * v;
    (
        w_tl * tl.0 + w_tr * tr.0 + w_bl * bl.0 + w_br * br.0,
        w_tl * tl.1 + w_tr * tr.1 + w_bl * bl.1 + w_br * br.1,
    )
}

fn ratio(value: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span.abs() < f64::EPSILON {
        0.0
    } else {
        (value - start) / span
    }
}

impl BilinearQuad {
    /// Creates a new [`BilinearQuad`]
    #[must_use]
    pub const fn new(src: [Point; 4], dst: [Point; 4]) -> Self {
        Self { src, dst }
    }

    /// Maps a source point onto the destination quad.
    ///
    /// `u` and `v` are taken from the source bounding box, which is only exact while the
    /// source quad is axis-aligned. Pixel quads always are.
    #[must_use]
    pub fn transform(&self, x: f64, y: f64) -> Point {
        let (min_x, max_x) = self
            .src
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.0), hi.max(p.0))
            });
        let (min_y, max_y) = self
            .src
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });
        let u = ratio(x, min_x, max_x);
        let v = ratio(y, min_y, max_y);
        blend(&self.dst, u, v)
    }

    /// Maps a destination point back onto the source quad.
    ///
    /// The destination is treated as geographic: `x` is longitude and `y` is latitude, which
    /// decreases from the top edge to the bottom edge. The first estimate of `(u, v)` comes from
    /// the averaged edges and is refined by Newton-Raphson.
    #[must_use]
    pub fn inverse_transform(&self, x: f64, y: f64) -> Point {
        let (u, v) = self.solve_uv(x, y);
        blend(&self.src, u, v)
    }

    /// Normalized quad parameters for a destination point
    pub(crate) fn solve_uv(&self, x: f64, y: f64) -> Point {
        let [tl, tr, br, bl] = self.dst;
        let west = (tl.0 + bl.0) / 2.0;
        let east = (tr.0 + br.0) / 2.0;
        let top = (tl.1 + tr.1) / 2.0;
        let bottom = (bl.1 + br.1) / 2.0;

        let mut u = ratio(x, west, east).clamp(0.0, 1.0);
        let mut v = ratio(top - y, 0.0, top - bottom).clamp(0.0, 1.0);

        for iteration in 0..MAX_ITERATIONS {
            let (bx, by) = blend(&self.dst, u, v);
            let (rx, ry) = (bx - x, by - y);
            if rx.abs() < CONVERGED && ry.abs() < CONVERGED {
                trace!(iteration, "Bilinear inverse converged");
                break;
            }

            // partial derivatives of the blend
            let dxdu = (1.0 - v) * (tr.0 - tl.0) + v * (br.0 - bl.0);
            let dydu = (1.0 - v) * (tr.1 - tl.1) + v * (br.1 - bl.1);
            let dxdv = (1.0 - u) * (bl.0 - tl.0) + u * (br.0 - tr.0);
            let dydv = (1.0 - u) * (bl.1 - tl.1) + u * (br.1 - tr.1);

            let det = dxdu.mul_add(dydv, -(dxdv * dydu));
            if det.abs() < DEGENERATE_JACOBIAN {
                debug!(iteration, det, "Degenerate quad in bilinear inverse");
                break;
            }

            u -= dydv.mul_add(rx, -(dxdv * ry)) / det;
            v -= dxdu.mul_add(ry, -(dydu * rx)) / det;
        }
        (u, v)
    }
}
