use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use strum::{EnumString, IntoStaticStr};
use tracing::{debug, trace, warn};

use crate::{
    calibration::{CorrespondencePoint, UtmCorrespondence},
    projection::utm_to_wgs84,
    transform::Point,
};

use super::{
    error::Error,
    utils::{
        handle_opt_ires, parse_degrees_minutes, parse_dimension, parse_hemisphere, parse_integer,
        parse_number, parse_zone,
    },
};

const HEADER_PREFIX: &str = "OziExplorer Map Data File";
const DEFAULT_DATUM: &str = "WGS 84";
const DEFAULT_PROJECTION: &str = "Latitude/Longitude";
const POINT_FIELDS: usize = 17;

// Lines 0-4 are positional, tagged records follow
const TITLE_LINE: usize = 1;
const IMAGE_LINE: usize = 2;
const DATUM_LINE: usize = 4;
const FIRST_RECORD_LINE: usize = 5;

static RECORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(Point)\d*|(IWH|Map Projection|MMPXY|MMPLL)),").expect("valid record regex")
});

#[derive(IntoStaticStr, EnumString, PartialEq, Eq, Debug, Copy, Clone)]
#[allow(clippy::upper_case_acronyms)]
pub enum Record {
    Point,
    IWH,
    #[strum(serialize = "Map Projection")]
    MapProjection,
    MMPXY,
    MMPLL,
}

impl Record {
    /// Identifies the record a line holds, if any
    fn of_line(line: &str) -> Option<Self> {
        let caps = RECORD_REGEX.captures(line)?;
        let tag = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Self::from_str(tag).ok()
    }
}

/// Everything the `.map` file says, before any geometry is derived from it
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RawSidecar {
    pub title: String,
    pub image_path: String,
    pub datum: String,
    pub projection: String,
    pub points: Vec<CorrespondencePoint>,
    pub utm_points: Vec<UtmCorrespondence>,
    pub image_size: Option<(u32, u32)>,
    /// `MMPXY` corners, file order
    pub mmpxy: Vec<Point>,
    /// `MMPLL` corners as `(lon, lat)`, file order
    pub mmpll: Vec<Point>,
}

/// Result of a single `Point` record
#[derive(Debug, PartialEq)]
pub struct PointRecord {
    pub point: CorrespondencePoint,
    pub utm: Option<UtmCorrespondence>,
}

pub fn parse_point(line: &str) -> Result<PointRecord, Error> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < POINT_FIELDS {
        return Err(Error::TooFewFields {
            found: fields.len(),
            expected: POINT_FIELDS,
        });
    }
    let (Some(pixel_x), Some(pixel_y)) = (
        handle_opt_ires(parse_integer, fields[2]),
        handle_opt_ires(parse_integer, fields[3]),
    ) else {
        return Err(Error::InvalidPixel);
    };

    let from_degrees = if fields[5].trim() == "deg" {
        parse_degrees_minutes(fields[6], fields[7], fields[8])
            .zip(parse_degrees_minutes(fields[9], fields[10], fields[11]))
    } else {
        None
    };

    let utm = fields
        .iter()
        .position(|f| f.trim() == "grid")
        .filter(|&i| i + 4 < fields.len())
        .and_then(|i| {
            let zone = handle_opt_ires(parse_zone, fields[i + 1])?;
            let easting = handle_opt_ires(parse_number, fields[i + 2])?;
            let northing = handle_opt_ires(parse_number, fields[i + 3])?;
            let southern = matches!(
                handle_opt_ires(parse_hemisphere, fields[i + 4]),
                Some('S' | 's')
            );
            Some(UtmCorrespondence {
                pixel_x,
                pixel_y,
                easting,
                northing,
                zone,
                southern,
            })
        });

    let (latitude, longitude) = from_degrees
        .or_else(|| utm.map(|u| utm_to_wgs84(u.easting, u.northing, u.zone, u.southern)))
        .ok_or(Error::MissingCoordinates)?;

    Ok(PointRecord {
        point: CorrespondencePoint {
            pixel_x,
            pixel_y,
            latitude,
            longitude,
        },
        utm,
    })
}

fn parse_pair<T>(
    fields: &[&str],
    parser: impl Fn(&str) -> nom::IResult<&str, T>,
) -> Option<(T, T)> {
    let first = handle_opt_ires(&parser, fields.get(2)?)?;
    let second = handle_opt_ires(&parser, fields.get(3)?)?;
    Some((first, second))
}

/// Scans a `.map` file.
///
/// Nothing in here fails: unreadable records are logged and skipped, missing header values
/// fall back to their defaults.
pub fn parse_sidecar(input: &str) -> RawSidecar {
    let mut sidecar = RawSidecar {
        datum: DEFAULT_DATUM.to_owned(),
        projection: DEFAULT_PROJECTION.to_owned(),
        ..RawSidecar::default()
    };

    for (i, line) in input.lines().enumerate() {
        match i {
            0 => {
                if !line.starts_with(HEADER_PREFIX) {
                    warn!("Unrecognized map file header: {line:?}");
                }
            }
            TITLE_LINE => line.clone_into(&mut sidecar.title),
            IMAGE_LINE => line.clone_into(&mut sidecar.image_path),
            DATUM_LINE => {
                let datum = line.split(',').next().unwrap_or_default().trim();
                if !datum.is_empty() {
                    datum.clone_into(&mut sidecar.datum);
                }
            }
            i if i >= FIRST_RECORD_LINE => parse_record(line, &mut sidecar),
            _ => {}
        }
    }

    debug!(
        points = sidecar.points.len(),
        utm_points = sidecar.utm_points.len(),
        mmpxy = sidecar.mmpxy.len(),
        mmpll = sidecar.mmpll.len(),
        image_size = ?sidecar.image_size,
        "Scanned map file"
    );
    sidecar
}

fn parse_record(line: &str, sidecar: &mut RawSidecar) {
    let Some(record) = Record::of_line(line) else {
        return;
    };
    let fields: Vec<&str> = line.split(',').collect();
    match record {
        Record::Point => match parse_point(line) {
            Ok(PointRecord { point, utm }) => {
                trace!(?point, "Calibration point");
                sidecar.points.push(point);
                sidecar.utm_points.extend(utm);
            }
            Err(e) => trace!("Skipping {line:?}: {e}"),
        },
        Record::IWH => {
            sidecar.image_size = parse_pair(&fields, parse_dimension);
            if sidecar.image_size.is_none() {
                warn!("Invalid image size record: {line:?}");
            }
        }
        Record::MapProjection => {
            if let Some(name) = fields.get(1).map(|f| f.trim()).filter(|f| !f.is_empty()) {
                name.clone_into(&mut sidecar.projection);
            }
        }
        Record::MMPXY => match parse_pair(&fields, parse_integer) {
            Some((x, y)) => sidecar.mmpxy.push((f64::from(x), f64::from(y))),
            None => warn!("Invalid {} record: {line:?}", Into::<&str>::into(record)),
        },
        Record::MMPLL => match parse_pair(&fields, parse_number) {
            Some(lon_lat) => sidecar.mmpll.push(lon_lat),
            None => warn!("Invalid {} record: {line:?}", Into::<&str>::into(record)),
        },
    }
}
