use tracing::{debug, warn};

use super::Point;

/// Below this, a fit matrix is treated as singular
const SINGULAR_EPSILON: f64 = 1e-10;

/// A 2-D affine transform
///
/// ```"not rust"
/// x' = a·x + b·y + c
/// y' = d·x + e·y + f
/// ```
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
#[allow(missing_docs)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Creates a new [`AffineTransform`] from its six coefficients
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Applies the transform to `(x, y)`
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> Point {
        (
            self.a.mul_add(x, self.b.mul_add(y, self.c)),
            self.d.mul_add(x, self.e.mul_add(y, self.f)),
        )
    }

    /// Determinant of the linear part
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a.mul_add(self.e, -(self.b * self.d))
    }

    /// Returns the inverse transform, or [`None`] if the linear part is singular
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() <= SINGULAR_EPSILON {
            return None;
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Some(Self {
            a,
            b,
            c: -a.mul_add(self.c, b * self.f),
            d,
            e,
            f: -d.mul_add(self.c, e * self.f),
        })
    }
}

/// Fits an affine transform mapping `src` onto `dst`.
///
/// - fewer than two pairs (or slices of different lengths) give [`None`]
/// - two pairs give an axis-aligned transform (`b = d = 0`) from the ratio of deltas. An axis
///   whose source delta vanishes is left as a zero transform.
/// - three or more pairs give the least-squares solution. If the normal equations are singular
///   the fit falls back to the first two pairs.
#[must_use]
pub fn fit_affine(src: &[Point], dst: &[Point]) -> Option<AffineTransform> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }
    if src.len() == 2 {
        return Some(fit_axis_aligned(src[0], src[1], dst[0], dst[1]));
    }
    least_squares(src, dst).or_else(|| {
        warn!(
            "Singular affine fit over {} points, retrying with the first two",
            src.len()
        );
        fit_affine(&src[..2], &dst[..2])
    })
}

fn axis_ratio(s0: f64, s1: f64, t0: f64, t1: f64) -> (f64, f64) {
    let delta = s1 - s0;
    if delta.abs() < SINGULAR_EPSILON {
        return (0.0, 0.0);
    }
    let scale = (t1 - t0) / delta;
    (scale, scale.mul_add(-s0, t0))
}

fn fit_axis_aligned(s0: Point, s1: Point, t0: Point, t1: Point) -> AffineTransform {
    let (a, c) = axis_ratio(s0.0, s1.0, t0.0, t1.0);
    let (e, f) = axis_ratio(s0.1, s1.1, t0.1, t1.1);
    debug!(a, c, e, f, "Two point affine fit");
    AffineTransform::new(a, 0.0, c, 0.0, e, f)
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * m[1][1].mul_add(m[2][2], -(m[1][2] * m[2][1]))
        - m[0][1] * m[1][0].mul_add(m[2][2], -(m[1][2] * m[2][0]))
        + m[0][2] * m[1][0].mul_add(m[2][1], -(m[1][1] * m[2][0]))
}

/// Solves `m · [p, q, r] = rhs` by Cramer's rule given `det = det3(m)`
fn cramer(m: &[[f64; 3]; 3], det: f64, rhs: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (col, slot) in out.iter_mut().enumerate() {
        let mut replaced = *m;
        for (row, value) in rhs.iter().enumerate() {
            replaced[row][col] = *value;
        }
        *slot = det3(&replaced) / det;
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn least_squares(src: &[Point], dst: &[Point]) -> Option<AffineTransform> {
    let n = src.len() as f64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut su, mut sxu, mut syu) = (0.0, 0.0, 0.0);
    let (mut sv, mut sxv, mut syv) = (0.0, 0.0, 0.0);
    for (&(x, y), &(u, v)) in src.iter().zip(dst) {
        sx += x;
        sy += y;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
        su += u;
        sxu += x * u;
        syu += y * u;
        sv += v;
        sxv += x * v;
        syv += y * v;
    }

    let normal = [[sxx, sxy, sx], [sxy, syy, sy], [sx, sy, n]];
    let det = det3(&normal);
    if det.abs() < SINGULAR_EPSILON {
        return None;
    }

    let [a, b, c] = cramer(&normal, det, [sxu, syu, su]);
    let [d, e, f] = cramer(&normal, det, [sxv, syv, sv]);
    Some(AffineTransform::new(a, b, c, d, e, f))
}
