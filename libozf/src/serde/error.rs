use thiserror::Error;

/// Reasons a `Point` record is left out of a calibration
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("point record has {found} fields, at least {expected} are required")]
    TooFewFields { found: usize, expected: usize },
    #[error("pixel coordinates missing or invalid")]
    InvalidPixel,
    #[error("neither degree nor grid coordinates present")]
    MissingCoordinates,
}
