use itertools::Itertools;
use tracing::{debug, warn};

use crate::transform::{fit_affine, AffineTransform, BilinearQuad, Point, TransformStrategy};

use super::{image_corners, UtmCorrespondence};

// Pixel deltas below this count as "same row/column"
const COLLINEAR_EPSILON: f64 = 1e-10;

/// A UTM position attached to one image corner
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct UtmCorner {
    /// Pixel position of the corner
    pub pixel: Point,
    /// UTM easting in metres
    pub easting: f64,
    /// UTM northing in metres (including the false northing south of the equator)
    pub northing: f64,
}

/// Pixel to UTM grid calibration, derived from `Point` records that carry grid coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct UtmCalibration {
    /// UTM zone shared by every grid point
    pub zone: u8,
    /// Whether northings carry the southern false northing
    pub southern: bool,
    /// Affine fit from pixel to `(easting, northing)`
    pub pixel_to_utm: AffineTransform,
    /// Inverse of [`Self::pixel_to_utm`], absent when its linear part is singular
    pub utm_to_pixel: Option<AffineTransform>,
    /// [`Self::pixel_to_utm`] evaluated at the four image corners, in
    /// [`crate::transform::Corner`] order. Preferred over the plain affine when present.
    pub bilinear_corners: Option<[UtmCorner; 4]>,
}

impl UtmCalibration {
    /// Builds a UTM calibration from grid points.
    ///
    /// Needs at least two points, all in the same zone. Image corners are only derived when the
    /// image size is known.
    pub(crate) fn assemble(
        points: &[UtmCorrespondence],
        image_size: Option<(u32, u32)>,
    ) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let Ok(zone) = points.iter().map(|p| p.zone).all_equal_value() else {
            warn!("UTM points span several zones, ignoring grid calibration");
            return None;
        };
        let southern = points[0].southern;

        let pixels: Vec<Point> = points.iter().map(UtmCorrespondence::pixel).collect();
        let grid: Vec<Point> = points.iter().map(|p| (p.easting, p.northing)).collect();

        let coincident = pixels.len() == 2 && {
            let (dx, dy) = (pixels[1].0 - pixels[0].0, pixels[1].1 - pixels[0].1);
            dx.abs() < COLLINEAR_EPSILON && dy.abs() < COLLINEAR_EPSILON
        };
        let pixel_to_utm = if coincident {
            warn!("Both UTM points share a pixel position, leaving the grid fit at zero");
            AffineTransform::default()
        } else {
            fit_affine(&pixels, &grid)?
        };
        debug!(
            zone,
            a_e = pixel_to_utm.a,
            b_e = pixel_to_utm.b,
            c_e = pixel_to_utm.c,
            a_n = pixel_to_utm.d,
            b_n = pixel_to_utm.e,
            c_n = pixel_to_utm.f,
            "Pixel to UTM fit over {} points",
            points.len()
        );

        let utm_to_pixel = pixel_to_utm.inverse();
        if utm_to_pixel.is_none() {
            warn!(
                det = pixel_to_utm.determinant(),
                "Singular pixel to UTM fit, no inverse calibration"
            );
        }

        let bilinear_corners = image_size.map(|(w, h)| {
            image_corners(w, h).map(|pixel| {
                let (easting, northing) = pixel_to_utm.apply(pixel.0, pixel.1);
                UtmCorner {
                    pixel,
                    easting,
                    northing,
                }
            })
        });

        Some(Self {
            zone,
            southern,
            pixel_to_utm,
            utm_to_pixel,
            bilinear_corners,
        })
    }

    /// The pixel to geo strategy this calibration follows
    #[must_use]
    pub const fn strategy(&self) -> TransformStrategy {
        if self.bilinear_corners.is_some() {
            TransformStrategy::UtmBilinear
        } else {
            TransformStrategy::UtmAffine
        }
    }

    /// Converts a pixel position to `(easting, northing)`
    #[must_use]
    pub fn pixel_to_grid(&self, px: f64, py: f64) -> Point {
        self.bilinear_corners.as_ref().map_or_else(
            || self.pixel_to_utm.apply(px, py),
            |corners| {
                BilinearQuad::new(
                    corners.map(|c| c.pixel),
                    corners.map(|c| (c.easting, c.northing)),
                )
                .transform(px, py)
            },
        )
    }
}
