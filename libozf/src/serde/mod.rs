//! Reading of the line oriented `.map` calibration file
pub(crate) mod error;
mod record;
mod utils;

pub(crate) use record::{parse_sidecar, RawSidecar};

#[cfg(test)]
mod tests {
    use super::{error::Error, record::parse_point, *};

    const POINT_DEG: &str = "Point01,xy,  100,  200,in, deg,  45, 30.0000,N,  10, 15.0000,W, grid,   ,           ,           ,N";
    const POINT_GRID: &str = "Point02,xy, 1500,  900,in, deg,    ,        ,N,    ,        ,E, grid,  33,   500000.0,  5300000.0,N";
    const POINT_EMPTY: &str = "Point03,xy,     ,     ,in, deg,    ,        ,N,    ,        ,E, grid,   ,           ,           ,N";

    #[test]
    fn degree_point() {
        let record = parse_point(POINT_DEG).unwrap();
        assert_eq!((record.point.pixel_x, record.point.pixel_y), (100, 200));
        assert!((record.point.latitude - 45.5).abs() < 1e-12);
        assert!((record.point.longitude + 10.25).abs() < 1e-12);
        assert!(record.utm.is_none());
    }

    #[test]
    fn grid_point_is_projected() {
        let record = parse_point(POINT_GRID).unwrap();
        let utm = record.utm.unwrap();
        assert_eq!(utm.zone, 33);
        assert!(!utm.southern);
        // easting 500000 lies on the zone's central meridian
        assert!((record.point.longitude - 15.0).abs() < 1e-9);
        assert!(record.point.latitude > 47.0 && record.point.latitude < 48.5);
    }

    #[test]
    fn unused_point_is_rejected() {
        assert_eq!(parse_point(POINT_EMPTY), Err(Error::InvalidPixel));
        assert_eq!(
            parse_point("Point04,xy,1,2"),
            Err(Error::TooFewFields {
                found: 4,
                expected: 17
            })
        );
        let no_coords = POINT_EMPTY.replacen("     ,     ", "   10,   20", 1);
        assert_eq!(parse_point(&no_coords), Err(Error::MissingCoordinates));
    }

    #[test]
    fn header_and_records() {
        let sidecar = parse_sidecar(
            "OziExplorer Map Data File Version 2.2\r\n\
             Alps\r\n\
             C:\\maps\\alps.ozf2\r\n\
             1 ,Map Code,\r\n\
             European 1950,WGS 84,   0.0000,   0.0000,WGS 84\r\n\
             Reserved 1\r\n\
             Map Projection,Transverse Mercator,PolyCal,No,AutoCalOnly,No,BSBUseWPX,No\r\n\
             MMPXY,1,0,0\r\n\
             MMPLL,1,   7.000000,  46.000000\r\n\
             IWH,Map Image Width/Height,1000,800\r\n",
        );
        assert_eq!(sidecar.title, "Alps");
        assert_eq!(sidecar.image_path, "C:\\maps\\alps.ozf2");
        assert_eq!(sidecar.datum, "European 1950");
        assert_eq!(sidecar.projection, "Transverse Mercator");
        assert_eq!(sidecar.mmpxy, vec![(0.0, 0.0)]);
        assert_eq!(sidecar.mmpll, vec![(7.0, 46.0)]);
        assert_eq!(sidecar.image_size, Some((1000, 800)));
    }

    #[test]
    fn defaults_for_short_file() {
        let sidecar = parse_sidecar("OziExplorer Map Data File Version 2.2\nOnly a title\n");
        assert_eq!(sidecar.title, "Only a title");
        assert_eq!(sidecar.datum, "WGS 84");
        assert_eq!(sidecar.projection, "Latitude/Longitude");
        assert!(sidecar.points.is_empty());
    }
}
