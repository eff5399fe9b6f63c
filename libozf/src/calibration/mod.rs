mod bounds;
mod utm;

pub use bounds::BoundsSource;
pub use utm::{UtmCalibration, UtmCorner};

use std::{fs, path::Path};

use tracing::{debug, info};

use crate::{
    projection::{utm_to_wgs84, wgs84_to_utm},
    serde::{parse_sidecar, RawSidecar},
    transform::{fit_affine, AffineTransform, BilinearQuad, Corner, Point, TransformStrategy},
    Error,
};

use bounds::BoundsInput;

/// A pixel position tied to a geographic position
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CorrespondencePoint {
    /// Pixel column
    pub pixel_x: i32,
    /// Pixel row
    pub pixel_y: i32,
    /// Latitude in decimal degrees, positive north
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east
    pub longitude: f64,
}

impl CorrespondencePoint {
    /// Pixel position as a [`Point`]
    #[must_use]
    pub fn pixel(&self) -> Point {
        (f64::from(self.pixel_x), f64::from(self.pixel_y))
    }

    /// Geographic position as `(lon, lat)`
    #[must_use]
    pub const fn lon_lat(&self) -> Point {
        (self.longitude, self.latitude)
    }
}

/// A pixel position tied to a UTM grid position
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct UtmCorrespondence {
    /// Pixel column
    pub pixel_x: i32,
    /// Pixel row
    pub pixel_y: i32,
    /// Easting in metres
    pub easting: f64,
    /// Northing in metres
    pub northing: f64,
    /// UTM zone number
    pub zone: u8,
    /// Whether the grid reference is in the southern hemisphere
    pub southern: bool,
}

impl UtmCorrespondence {
    /// Pixel position as a [`Point`]
    #[must_use]
    pub fn pixel(&self) -> Point {
        (f64::from(self.pixel_x), f64::from(self.pixel_y))
    }
}

/// An axis-aligned geographic envelope, in decimal degrees
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
#[allow(missing_docs)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Smallest envelope holding every `(lat, lon)`. [`None`] for no points.
    pub fn envelope(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, (lat, lon)| {
            Some(acc.map_or(
                Self {
                    north: lat,
                    south: lat,
                    east: lon,
                    west: lon,
                },
                |b| Self {
                    north: b.north.max(lat),
                    south: b.south.min(lat),
                    east: b.east.max(lon),
                    west: b.west.min(lon),
                },
            ))
        })
    }

    /// Whether `(lat, lon)` lies inside the envelope, edges included
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }
}

/// Pixel corners of a `width` x `height` image in top-left, top-right, bottom-right,
/// bottom-left order
pub(crate) fn image_corners(width: u32, height: u32) -> [Point; 4] {
    let (w, h) = (f64::from(width), f64::from(height));
    [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
}

fn ratio(value: f64, extent: Option<u32>) -> f64 {
    match extent {
        Some(e) if e > 0 => value / f64::from(e),
        _ => 0.0,
    }
}

/// Georeferencing of a single map image, read from its `.map` file.
///
/// Building a calibration never fails. Missing data makes it less precise instead: check
/// [`Self::utm_calibration`], [`Self::corner_points`] or [`Self::bounds_source`] to find out
/// how much the calibration can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapCalibration {
    title: String,
    image_path: String,
    projection: String,
    datum: String,
    correspondences: Vec<CorrespondencePoint>,
    bounds: Bounds,
    bounds_source: BoundsSource,
    image_size: Option<(u32, u32)>,
    corner_points: Option<[(f64, f64); 4]>,
    utm_calibration: Option<UtmCalibration>,
    // fits over `correspondences`, computed once
    pixel_fit: Option<AffineTransform>,
    geo_fit: Option<AffineTransform>,
}

impl MapCalibration {
    /// Reads and parses a `.map` file
    ///
    /// # Errors
    ///
    /// This function only errors if the file cannot be read. Its content is never rejected.
    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        let bytes = fs::read(filename.as_ref())?;
        info!("Read {} bytes of map file {}", bytes.len(), filename.as_ref().display());
        // .map files are usually windows-1252, only ASCII matters for parsing
        Ok(Self::from_sidecar_str(&String::from_utf8_lossy(&bytes)))
    }

    /// Parses the content of a `.map` file
    #[must_use]
    pub fn from_sidecar_str(input: &str) -> Self {
        Self::from_raw(parse_sidecar(input))
    }

    fn from_raw(raw: RawSidecar) -> Self {
        let RawSidecar {
            title,
            image_path,
            datum,
            projection,
            points,
            utm_points,
            image_size,
            mmpxy,
            mmpll,
        } = raw;

        let pixels: Vec<Point> = points.iter().map(CorrespondencePoint::pixel).collect();
        let lon_lats: Vec<Point> = points.iter().map(CorrespondencePoint::lon_lat).collect();

        let mut calibration = Self {
            title,
            image_path,
            projection,
            datum,
            utm_calibration: UtmCalibration::assemble(&utm_points, image_size),
            pixel_fit: fit_affine(&pixels, &lon_lats),
            geo_fit: fit_affine(&lon_lats, &pixels),
            correspondences: points,
            bounds: Bounds::default(),
            bounds_source: BoundsSource::Unresolved,
            image_size,
            corner_points: None,
        };

        let resolved = bounds::resolve(&BoundsInput {
            calibration: &calibration,
            mmpxy: &mmpxy,
            mmpll: &mmpll,
        });
        calibration.bounds = resolved.bounds;
        calibration.bounds_source = resolved.source;
        calibration.corner_points = resolved.corners;

        debug!(
            title = calibration.title(),
            forward = %calibration.forward_strategy(),
            inverse = %calibration.inverse_strategy(),
            "Built map calibration"
        );
        calibration
    }

    /// Map title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Image file name as written in the `.map` file. Informational only.
    #[must_use]
    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    /// Projection name, e.g. `Latitude/Longitude` or `Transverse Mercator`
    #[must_use]
    pub fn projection(&self) -> &str {
        &self.projection
    }

    /// Datum name, e.g. `WGS 84`
    #[must_use]
    pub fn datum(&self) -> &str {
        &self.datum
    }

    /// Calibration points in file order
    #[must_use]
    pub fn correspondences(&self) -> &[CorrespondencePoint] {
        &self.correspondences
    }

    /// Geographic envelope of the map
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// What [`Self::bounds`] was derived from
    #[must_use]
    pub const fn bounds_source(&self) -> BoundsSource {
        self.bounds_source
    }

    /// Image `(width, height)` in pixels, if the `.map` file states it
    #[must_use]
    pub const fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Image width in pixels, 0 if unknown
    #[must_use]
    pub fn image_width(&self) -> u32 {
        self.image_size.map_or(0, |(w, _)| w)
    }

    /// Image height in pixels, 0 if unknown
    #[must_use]
    pub fn image_height(&self) -> u32 {
        self.image_size.map_or(0, |(_, h)| h)
    }

    /// `(lat, lon)` of the map corners (top-left, top-right, bottom-right, bottom-left)
    #[must_use]
    pub const fn corner_points(&self) -> Option<&[(f64, f64); 4]> {
        self.corner_points.as_ref()
    }

    /// `(lat, lon)` of a single map corner
    #[must_use]
    pub fn corner(&self, corner: Corner) -> Option<(f64, f64)> {
        self.corner_points.map(|corners| corners[corner as usize])
    }

    /// Grid calibration, present when the `.map` file has UTM points
    #[must_use]
    pub const fn utm_calibration(&self) -> Option<&UtmCalibration> {
        self.utm_calibration.as_ref()
    }

    /// Strategy used by [`Self::pixel_to_geo`]
    #[must_use]
    pub fn forward_strategy(&self) -> TransformStrategy {
        if let Some(utm) = &self.utm_calibration {
            return utm.strategy();
        }
        match self.correspondences.len() {
            0 | 1 => TransformStrategy::Linear,
            4 => TransformStrategy::Bilinear,
            _ if self.pixel_fit.is_some() => TransformStrategy::Affine,
            _ => TransformStrategy::Linear,
        }
    }

    /// Strategy used by [`Self::geo_to_pixel`].
    ///
    /// This never picks [`TransformStrategy::Bilinear`]: four point maps convert back with an
    /// affine fit, so a round trip through both directions is not exact for them.
    #[must_use]
    pub fn inverse_strategy(&self) -> TransformStrategy {
        if self
            .utm_calibration
            .as_ref()
            .is_some_and(|utm| utm.utm_to_pixel.is_some())
        {
            TransformStrategy::UtmAffine
        } else if self.geo_fit.is_some() {
            TransformStrategy::Affine
        } else {
            TransformStrategy::Linear
        }
    }

    /// Converts a pixel position to `(lat, lon)`
    #[must_use]
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> (f64, f64) {
        if let Some(utm) = &self.utm_calibration {
            let (easting, northing) = utm.pixel_to_grid(px, py);
            return utm_to_wgs84(easting, northing, utm.zone, utm.southern);
        }
        if self.correspondences.len() < 2 {
            return self.interpolate_bounds(px, py);
        }
        if let [a, b, c, d] = self.correspondences.as_slice() {
            let quad = BilinearQuad::new(
                [a.pixel(), b.pixel(), c.pixel(), d.pixel()],
                [a.lon_lat(), b.lon_lat(), c.lon_lat(), d.lon_lat()],
            );
            let (lon, lat) = quad.transform(px, py);
            return (lat, lon);
        }
        self.pixel_fit.map_or_else(
            || self.interpolate_bounds(px, py),
            |fit| {
                let (lon, lat) = fit.apply(px, py);
                (lat, lon)
            },
        )
    }

    /// Converts `(lat, lon)` to a pixel position `(x, y)`
    #[must_use]
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> Point {
        if let Some((utm, inverse)) = self
            .utm_calibration
            .as_ref()
            .and_then(|utm| utm.utm_to_pixel.map(|inverse| (utm, inverse)))
        {
            let (easting, northing) = wgs84_to_utm(lat, lon, utm.zone);
            return inverse.apply(easting, northing);
        }
        self.geo_fit.map_or_else(
            || self.invert_bounds(lat, lon),
            |fit| fit.apply(lon, lat),
        )
    }

    /// Linear interpolation of a pixel position over [`Self::bounds`]
    fn interpolate_bounds(&self, px: f64, py: f64) -> (f64, f64) {
        let Bounds {
            north,
            south,
            east,
            west,
        } = self.bounds;
        let u = ratio(px, self.image_size.map(|(w, _)| w));
        let v = ratio(py, self.image_size.map(|(_, h)| h));
        ((north - south).mul_add(-v, north), (east - west).mul_add(u, west))
    }

    fn invert_bounds(&self, lat: f64, lon: f64) -> Point {
        let Bounds {
            north,
            south,
            east,
            west,
        } = self.bounds;
        let u = if (east - west).abs() > f64::EPSILON {
            (lon - west) / (east - west)
        } else {
            0.0
        };
        let v = if (north - south).abs() > f64::EPSILON {
            (north - lat) / (north - south)
        } else {
            0.0
        };
        (
            u * f64::from(self.image_width()),
            v * f64::from(self.image_height()),
        )
    }
}
