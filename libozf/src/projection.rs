//! Forward and inverse Transverse Mercator for UTM zones.
//!
//! The series are the ones given by Snyder (USGS Professional Paper 1395): the inverse uses the
//! footprint latitude through `e1^4` and the sixth order corrections, the forward uses terms up to
//! `A^5` for the easting and `A^6` for the northing.
//!
//! Zone numbers are not validated. A zone outside `1..=60` simply produces a central meridian
//! outside the usual range.

/// WGS84 semi-major axis in metres
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM scale factor on the central meridian
pub const UTM_K0: f64 = 0.9996;
/// Easting of the central meridian
pub const FALSE_EASTING: f64 = 500_000.0;
/// Northing added south of the equator
pub const FALSE_NORTHING: f64 = 10_000_000.0;

// first eccentricity squared
const E2: f64 = WGS84_F * (2.0 - WGS84_F);
// second eccentricity squared
const EP2: f64 = E2 / (1.0 - E2);

/// Central meridian of a UTM zone, in degrees
#[must_use]
pub fn central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// Converts a UTM position to WGS84 `(latitude, longitude)` in degrees.
///
/// `southern` removes the false northing before projecting back.
#[must_use]
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u8, southern: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if southern {
        northing - FALSE_NORTHING
    } else {
        northing
    };

    let m = y / UTM_K0;
    let mu = m / (WGS84_A * (1.0 - E2 / 4.0 - 3.0 * E2.powi(2) / 64.0 - 5.0 * E2.powi(3) / 256.0));

    let sqrt_1me2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);

    // footprint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = phi1.tan();
    let n1 = WGS84_A / (1.0 - E2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = EP2 * cos_phi1.powi(2);
    let r1 = WGS84_A * (1.0 - E2) / (1.0 - E2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * UTM_K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * EP2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                    - 252.0 * EP2
                    - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * EP2 + 24.0 * t1.powi(2))
            * d.powi(5)
            / 120.0)
        / cos_phi1;

    (lat.to_degrees(), central_meridian(zone) + lon.to_degrees())
}

/// Converts a WGS84 position (degrees) to UTM `(easting, northing)` in the given zone.
///
/// Negative latitudes get the southern false northing.
#[must_use]
pub fn wgs84_to_utm(lat: f64, lon: f64, zone: u8) -> (f64, f64) {
    let phi = lat.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = WGS84_A / (1.0 - E2 * sin_phi.powi(2)).sqrt();
    let t = tan_phi.powi(2);
    let c = EP2 * cos_phi.powi(2);
    let a = cos_phi * (lon - central_meridian(zone)).to_radians();

    let m = WGS84_A
        * ((1.0 - E2 / 4.0 - 3.0 * E2.powi(2) / 64.0 - 5.0 * E2.powi(3) / 256.0) * phi
            - (3.0 * E2 / 8.0 + 3.0 * E2.powi(2) / 32.0 + 45.0 * E2.powi(3) / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * E2.powi(2) / 256.0 + 45.0 * E2.powi(3) / 1024.0) * (4.0 * phi).sin()
            - (35.0 * E2.powi(3) / 3072.0) * (6.0 * phi).sin());

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * EP2) * a.powi(5) / 120.0)
        + FALSE_EASTING;

    let mut northing = UTM_K0
        * (m + n
            * tan_phi
            * (a.powi(2) / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * EP2) * a.powi(6) / 720.0));
    if lat < 0.0 {
        northing += FALSE_NORTHING;
    }

    (easting, northing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_meridians() {
        assert!((central_meridian(1) + 177.0).abs() < f64::EPSILON);
        assert!((central_meridian(31) - 3.0).abs() < f64::EPSILON);
        assert!((central_meridian(33) - 15.0).abs() < f64::EPSILON);
        assert!((central_meridian(60) - 177.0).abs() < f64::EPSILON);
    }

    #[test]
    fn equator_on_central_meridian() {
        let (e, n) = wgs84_to_utm(0.0, 3.0, 31);
        assert!((e - FALSE_EASTING).abs() < 1e-6);
        assert!(n.abs() < 1e-6);

        let (lat, lon) = utm_to_wgs84(FALSE_EASTING, 0.0, 31, false);
        assert!(lat.abs() < 1e-9);
        assert!((lon - 3.0).abs() < 1e-9);
    }

    #[test]
    fn known_position_eiffel_tower() {
        // 31U 448250.5 5411951.6
        let (e, n) = wgs84_to_utm(48.858_37, 2.294_48, 31);
        assert!((e - 448_250.5).abs() < 1.0, "easting {e}");
        assert!((n - 5_411_951.6).abs() < 1.0, "northing {n}");
    }

    #[test]
    fn round_trip_near_central_meridian() {
        for zone in [1u8, 17, 33, 60] {
            let cm = central_meridian(zone);
            let mut lat = -80.0;
            while lat <= 84.0 {
                for offset in [-3.0, -1.5, 0.0, 1.5, 3.0] {
                    let lon = cm + offset;
                    let (e, n) = wgs84_to_utm(lat, lon, zone);
                    let (lat2, lon2) = utm_to_wgs84(e, n, zone, lat < 0.0);
                    assert!(
                        (lat - lat2).abs() < 1e-6 && (lon - lon2).abs() < 1e-6,
                        "zone {zone} ({lat}, {lon}) -> ({lat2}, {lon2})"
                    );
                }
                lat += 8.0;
            }
        }
    }

    #[test]
    fn southern_hemisphere_uses_false_northing() {
        let (_, n) = wgs84_to_utm(-33.9, 18.4, 34);
        assert!(n > 6_000_000.0 && n < FALSE_NORTHING);
        let (lat, lon) = utm_to_wgs84(FALSE_EASTING, n, 34, true);
        assert!(lat < 0.0);
        assert!((lon - 21.0).abs() < 1.0);
    }
}
