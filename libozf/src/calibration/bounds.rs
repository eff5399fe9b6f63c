use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::transform::Point;

use super::{image_corners, Bounds, MapCalibration};

/// Which data the bounds (and corner points) of a calibration were derived from.
///
/// The variants are listed in order of preference.
#[derive(Default, Debug, Display, IntoStaticStr, Eq, PartialEq, Copy, Clone, Hash)]
pub enum BoundsSource {
    /// Image corners projected through the UTM calibration
    UtmCorners,
    /// The four `MMPLL` corners, backed by four `MMPXY` corners
    CornerQuad,
    /// The four `MMPLL` corners alone
    CornerCoordinates,
    /// Image corners projected through the correspondence points
    PointCorners,
    /// Envelope of the correspondence points themselves
    PointEnvelope,
    /// Nothing usable: bounds are all zero
    #[default]
    Unresolved,
}

/// Bounds chosen for a calibration, with the corners they envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Resolved {
    pub source: BoundsSource,
    /// `(lat, lon)` corners in top-left, top-right, bottom-right, bottom-left order
    pub corners: Option<[(f64, f64); 4]>,
    pub bounds: Bounds,
}

impl Resolved {
    fn from_corners(source: BoundsSource, corners: [(f64, f64); 4]) -> Self {
        Self {
            source,
            corners: Some(corners),
            bounds: Bounds::envelope(corners).unwrap_or_default(),
        }
    }
}

/// What the bounds tiers look at besides the calibration itself
pub(crate) struct BoundsInput<'a> {
    pub calibration: &'a MapCalibration,
    /// `MMPXY` pixel corners
    pub mmpxy: &'a [Point],
    /// `MMPLL` corners as `(lon, lat)`
    pub mmpll: &'a [Point],
}

type Tier = fn(&BoundsInput<'_>) -> Option<Resolved>;

// Three or more points with a known size and no corner quad have no tier of their own,
// they are handled by `point_corners`.
const TIERS: [Tier; 5] = [
    utm_corners,
    corner_quad,
    corner_coordinates,
    point_corners,
    point_envelope,
];

/// Tries every tier in order, first success wins
pub(crate) fn resolve(input: &BoundsInput<'_>) -> Resolved {
    let resolved = TIERS
        .iter()
        .find_map(|tier| tier(input))
        .unwrap_or(Resolved {
            source: BoundsSource::Unresolved,
            corners: None,
            bounds: Bounds::default(),
        });
    debug!(source = %resolved.source, bounds = ?resolved.bounds, "Resolved map bounds");
    resolved
}

fn projected_corners(calibration: &MapCalibration) -> Option<[(f64, f64); 4]> {
    let (w, h) = calibration.image_size()?;
    Some(image_corners(w, h).map(|(x, y)| calibration.pixel_to_geo(x, y)))
}

fn mmpll_corners(mmpll: &[Point]) -> Option<[(f64, f64); 4]> {
    match mmpll {
        [tl, tr, br, bl, ..] => Some([tl, tr, br, bl].map(|&(lon, lat)| (lat, lon))),
        _ => None,
    }
}

pub(crate) fn utm_corners(input: &BoundsInput<'_>) -> Option<Resolved> {
    input.calibration.utm_calibration()?;
    projected_corners(input.calibration)
        .map(|corners| Resolved::from_corners(BoundsSource::UtmCorners, corners))
}

pub(crate) fn corner_quad(input: &BoundsInput<'_>) -> Option<Resolved> {
    if input.calibration.utm_calibration().is_some() || input.mmpxy.len() < 4 {
        return None;
    }
    mmpll_corners(input.mmpll)
        .map(|corners| Resolved::from_corners(BoundsSource::CornerQuad, corners))
}

pub(crate) fn corner_coordinates(input: &BoundsInput<'_>) -> Option<Resolved> {
    mmpll_corners(input.mmpll)
        .map(|corners| Resolved::from_corners(BoundsSource::CornerCoordinates, corners))
}

pub(crate) fn point_corners(input: &BoundsInput<'_>) -> Option<Resolved> {
    if input.calibration.correspondences().len() < 2 {
        return None;
    }
    projected_corners(input.calibration)
        .map(|corners| Resolved::from_corners(BoundsSource::PointCorners, corners))
}

pub(crate) fn point_envelope(input: &BoundsInput<'_>) -> Option<Resolved> {
    Bounds::envelope(
        input
            .calibration
            .correspondences()
            .iter()
            .map(|p| (p.latitude, p.longitude)),
    )
    .map(|bounds| Resolved {
        source: BoundsSource::PointEnvelope,
        corners: None,
        bounds,
    })
}
