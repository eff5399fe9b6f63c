pub(crate) mod affine;
pub(crate) mod bilinear;

pub use affine::{fit_affine, AffineTransform};
pub use bilinear::{BilinearQuad, Corner};

use strum::{Display, IntoStaticStr};

/// A planar point, `(x, y)`.
///
/// Geographic points are stored as `(longitude, latitude)` so that `x` grows east.
pub type Point = (f64, f64);

/// The method a calibration uses to convert in one direction.
///
/// The forward (pixel to geo) and inverse (geo to pixel) directions pick their
/// strategy independently; see [`crate::MapCalibration::forward_strategy`] and
/// [`crate::MapCalibration::inverse_strategy`].
#[derive(Debug, Display, IntoStaticStr, Eq, PartialEq, Copy, Clone, Hash)]
pub enum TransformStrategy {
    /// Linear interpolation over the calibration bounds
    Linear,
    /// Affine fit over the correspondence points
    Affine,
    /// Bilinear blend over exactly four correspondence points
    Bilinear,
    /// Affine fit over UTM grid points, then UTM/WGS84 projection
    UtmAffine,
    /// Bilinear blend over the UTM image corners, then UTM/WGS84 projection
    UtmBilinear,
}
