mod common;

use common::{temp_file_with, CORNER_SIDECAR, EMPTY_SIDECAR, TWO_POINT_SIDECAR, UTM_SIDECAR};
use libozf::{
    calibration::BoundsSource, transform::Corner, Bounds, Error, MapCalibration,
    TransformStrategy,
};

const EPS: f64 = 1e-9;

fn assert_close((a0, a1): (f64, f64), (b0, b1): (f64, f64), eps: f64) {
    assert!(
        (a0 - b0).abs() < eps && (a1 - b1).abs() < eps,
        "{:?} != {:?}",
        (a0, a1),
        (b0, b1)
    );
}

#[test]
fn two_points_interpolate_over_bounds() -> anyhow::Result<()> {
    let file = temp_file_with(TWO_POINT_SIDECAR.as_bytes())?;
    let calibration = MapCalibration::from_file(&file)?;

    assert_eq!(calibration.title(), "Two points");
    assert_eq!(calibration.image_path(), "two_points.ozf2");
    assert_eq!(calibration.datum(), "WGS 84");
    assert_eq!(calibration.projection(), "Latitude/Longitude");
    // the blank third point is skipped
    assert_eq!(calibration.correspondences().len(), 2);
    assert_eq!(calibration.image_size(), Some((1000, 800)));
    assert_eq!(calibration.forward_strategy(), TransformStrategy::Affine);
    assert_eq!(calibration.bounds_source(), BoundsSource::PointCorners);

    let Bounds {
        north,
        south,
        east,
        west,
    } = calibration.bounds();
    assert_close((north, south), (46.0, 45.0), EPS);
    assert_close((east, west), (8.0, 7.0), EPS);

    assert_close(calibration.pixel_to_geo(0.0, 0.0), (north, west), EPS);
    for (px, py) in [(250.0, 200.0), (1000.0, 800.0), (600.0, 100.0)] {
        let expected = (
            north - (north - south) * py / 800.0,
            west + (east - west) * px / 1000.0,
        );
        assert_close(calibration.pixel_to_geo(px, py), expected, EPS);
    }
    Ok(())
}

#[test]
fn two_points_convert_back() {
    let calibration = MapCalibration::from_sidecar_str(TWO_POINT_SIDECAR);
    assert_eq!(calibration.inverse_strategy(), TransformStrategy::Affine);
    assert_close(calibration.geo_to_pixel(45.5, 7.5), (500.0, 400.0), 1e-6);
    assert_close(calibration.geo_to_pixel(46.0, 7.0), (0.0, 0.0), 1e-6);
}

#[test]
fn corner_quad_keeps_file_order() {
    let calibration = MapCalibration::from_sidecar_str(CORNER_SIDECAR);

    assert_eq!(calibration.projection(), "Mercator");
    assert_eq!(calibration.image_size(), Some((1000, 800)));
    assert_eq!(calibration.bounds_source(), BoundsSource::CornerQuad);
    assert_eq!(
        calibration.corner_points(),
        Some(&[(48.0, 10.0), (48.01, 11.0), (47.0, 11.01), (46.99, 9.99)])
    );
    assert_eq!(calibration.corner(Corner::BottomRight), Some((47.0, 11.01)));

    let bounds = calibration.bounds();
    assert_eq!(
        bounds,
        Bounds {
            north: 48.01,
            south: 46.99,
            east: 11.01,
            west: 9.99
        }
    );
}

#[test]
fn corners_without_pixel_corners() {
    let sidecar: String = CORNER_SIDECAR
        .lines()
        .filter(|line| !line.starts_with("MMPXY"))
        .map(|line| format!("{line}\n"))
        .collect();
    let calibration = MapCalibration::from_sidecar_str(&sidecar);
    assert_eq!(calibration.bounds_source(), BoundsSource::CornerCoordinates);
    assert_eq!(calibration.corner(Corner::TopLeft), Some((48.0, 10.0)));
}

#[test]
fn corner_quad_without_points() {
    let sidecar: String = CORNER_SIDECAR
        .lines()
        .filter(|line| !line.starts_with("Point"))
        .map(|line| format!("{line}\n"))
        .collect();
    let calibration = MapCalibration::from_sidecar_str(&sidecar);

    assert!(calibration.correspondences().is_empty());
    assert_eq!(calibration.image_size(), Some((1000, 800)));
    assert_eq!(calibration.bounds_source(), BoundsSource::CornerQuad);
    assert_eq!(
        calibration.corner_points(),
        Some(&[(48.0, 10.0), (48.01, 11.0), (47.0, 11.01), (46.99, 9.99)])
    );
}

#[test]
fn utm_calibration_resolves_zone() {
    let calibration = MapCalibration::from_sidecar_str(UTM_SIDECAR);

    let utm = calibration
        .utm_calibration()
        .expect("grid points give a UTM calibration");
    assert_eq!(utm.zone, 33);
    assert!(!utm.southern);
    assert!(utm.bilinear_corners.is_some());
    assert_eq!(calibration.image_size(), Some((2000, 1500)));
    assert_eq!(calibration.bounds_source(), BoundsSource::UtmCorners);
    assert_eq!(calibration.forward_strategy(), TransformStrategy::UtmBilinear);
    assert_eq!(calibration.inverse_strategy(), TransformStrategy::UtmAffine);

    let (lat, lon) = calibration.pixel_to_geo(1000.0, 750.0);
    assert!(calibration.bounds().contains(lat, lon));
    // central meridian of zone 33 is 15°E, the centre of the map sits on it
    assert!((lon - 15.0).abs() < 1e-6, "lon {lon}");
    assert!(lat > 46.9 && lat < 47.2, "lat {lat}");
}

#[test]
fn utm_corners_match_pixel_to_geo() {
    let calibration = MapCalibration::from_sidecar_str(UTM_SIDECAR);
    let corners = calibration
        .corner_points()
        .expect("image size gives corners");

    let pixels = [(0.0, 0.0), (2000.0, 0.0), (2000.0, 1500.0), (0.0, 1500.0)];
    for (pixel, corner) in pixels.iter().zip(corners) {
        assert_eq!(calibration.pixel_to_geo(pixel.0, pixel.1), *corner);
    }
    assert_eq!(
        Bounds::envelope(corners.iter().copied()),
        Some(calibration.bounds())
    );
}

#[test]
fn utm_round_trip() {
    let calibration = MapCalibration::from_sidecar_str(UTM_SIDECAR);
    for (px, py) in [(0.0, 0.0), (1000.0, 750.0), (1999.0, 1.0), (123.0, 1400.0)] {
        let (lat, lon) = calibration.pixel_to_geo(px, py);
        assert_close(calibration.geo_to_pixel(lat, lon), (px, py), 1e-3);
    }
}

#[test]
fn four_points_are_bilinear_one_way() {
    let sidecar = "OziExplorer Map Data File Version 2.2
Four points
four.ozf2
1 ,Map Code,
WGS 84,WGS 84,   0.0000,   0.0000,WGS 84
Point01,xy,    0,    0,in, deg,  46,  0.0000,N,   7,  0.0000,E, grid,   ,           ,           ,N
Point02,xy, 1000,    0,in, deg,  46,  6.0000,N,   8,  0.0000,E, grid,   ,           ,           ,N
Point03,xy, 1000,  800,in, deg,  45,  0.0000,N,   8,  6.0000,E, grid,   ,           ,           ,N
Point04,xy,    0,  800,in, deg,  45,  0.0000,N,   7,  0.0000,E, grid,   ,           ,           ,N
IWH,Map Image Width/Height,1000,800
";
    let calibration = MapCalibration::from_sidecar_str(sidecar);
    assert_eq!(calibration.correspondences().len(), 4);
    assert_eq!(calibration.forward_strategy(), TransformStrategy::Bilinear);
    assert_eq!(calibration.inverse_strategy(), TransformStrategy::Affine);

    // every point is reproduced exactly by the forward direction
    for point in calibration.correspondences() {
        let (px, py) = point.pixel();
        assert_close(
            calibration.pixel_to_geo(px, py),
            (point.latitude, point.longitude),
            EPS,
        );
    }

    // the affine inverse cannot follow the skewed quad
    let (lat, lon) = calibration.pixel_to_geo(1000.0, 0.0);
    let (px, py) = calibration.geo_to_pixel(lat, lon);
    assert!((px - 1000.0).abs() > 1e-3 || py.abs() > 1e-3);
}

#[test]
fn single_point_envelope() {
    let sidecar = "OziExplorer Map Data File Version 2.2
One point
one.ozf2
1 ,Map Code,
WGS 84,WGS 84,   0.0000,   0.0000,WGS 84
Point01,xy,   10,   20,in, deg,  12, 30.0000,S,  77,  0.0000,W, grid,   ,           ,           ,N
";
    let calibration = MapCalibration::from_sidecar_str(sidecar);
    assert_eq!(calibration.bounds_source(), BoundsSource::PointEnvelope);
    assert_eq!(calibration.forward_strategy(), TransformStrategy::Linear);
    assert_eq!(
        calibration.bounds(),
        Bounds {
            north: -12.5,
            south: -12.5,
            east: -77.0,
            west: -77.0
        }
    );
    assert!(calibration.corner_points().is_none());
}

#[test]
fn nothing_usable_gives_defaults() {
    let calibration = MapCalibration::from_sidecar_str(EMPTY_SIDECAR);

    assert_eq!(calibration.datum(), "WGS 84");
    assert_eq!(calibration.projection(), "Latitude/Longitude");
    assert_eq!(calibration.bounds(), Bounds::default());
    assert_eq!(calibration.bounds_source(), BoundsSource::Unresolved);
    assert_eq!(calibration.image_width(), 0);
    assert_eq!(calibration.forward_strategy(), TransformStrategy::Linear);
    assert_eq!(calibration.inverse_strategy(), TransformStrategy::Linear);
    assert!(calibration.utm_calibration().is_none());

    assert_eq!(calibration.pixel_to_geo(10.0, 10.0), (0.0, 0.0));
    assert_eq!(calibration.geo_to_pixel(45.0, 7.0), (0.0, 0.0));
}

#[test]
fn garbage_is_not_an_error() {
    let calibration = MapCalibration::from_sidecar_str("\u{0}\u{1}not a map file\n,,,,\n");
    assert_eq!(calibration.bounds_source(), BoundsSource::Unresolved);
    assert!(calibration.correspondences().is_empty());
}

#[test]
fn missing_file_is_an_error() {
    let result = MapCalibration::from_file("/nonexistent/definitely/missing.map");
    assert!(matches!(result, Err(Error::Io(_))));
}
