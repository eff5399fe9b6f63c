//! # libozf
//!
//!
//! This library provides datatypes and i/o functionality for `OziExplorer` raster maps: the
//! tiled `.ozf2`/`.ozf3`/`.ozfx3` image container and its companion `.map` calibration file.
//!
//! It provides two things:
//! - a calibration model built from the `.map` file, able to convert pixel coordinates
//!   to WGS84 latitude/longitude and back (see [`MapCalibration`])
//! - a decoder for the compressed container, handing out raw 64x64 tile blocks on demand
//!   (see [`OzfContainer`])
//!
//! [`LoadedMap`] ties both together and keeps a per-map cache of decoded tiles.
//!
//! ### History
//!
//! `OziExplorer` never published either format. The `.map` layout is line oriented and has been
//! stable for a long time, so it is documented by the many tools that read it. The container
//! layout is reverse-engineered; the byte offsets used by this crate are kept exactly as they
//! are found in legacy files, even where they look odd.
//!
//! ### Usage
//!
//! #### Converting between pixels and coordinates
//!
//! ```rust
//! use libozf::MapCalibration;
//!
//! let sidecar = "OziExplorer Map Data File Version 2.2\r\n\
//! Test map\r\n\
//! test.ozf2\r\n\
//! 1 ,Map Code,\r\n\
//! WGS 84,WGS 84,   0.0000,   0.0000,WGS 84\r\n\
//! Point01,xy,    0,    0,in, deg,  46,  0.0000,N,   7,  0.0000,E, grid,   ,           ,           ,N\r\n\
//! Point02,xy, 1000,  800,in, deg,  45,  0.0000,N,   8,  0.0000,E, grid,   ,           ,           ,N\r\n\
//! IWH,Map Image Width/Height,1000,800\r\n";
//!
//! let calibration = MapCalibration::from_sidecar_str(sidecar);
//! let (lat, lon) = calibration.pixel_to_geo(500.0, 400.0);
//! assert!((lat - 45.5).abs() < 1e-9);
//! assert!((lon - 7.5).abs() < 1e-9);
//!
//! let (px, py) = calibration.geo_to_pixel(lat, lon);
//! assert!((px - 500.0).abs() < 1e-6 && (py - 400.0).abs() < 1e-6);
//! ```
//!
//! #### Reading a tile
//!
//! ```rust,no_run
//! use libozf::LoadedMap;
//!
//! fn main() -> Result<(), libozf::Error> {
//!     let map = LoadedMap::open("../test_assets/alps.ozf2")?;
//!     let tile = map.tile(0, 0)?;
//!     println!("tile has {} bytes", tile.len());
//!     Ok(())
//! }
//! ```
//!
//! #### Unstable API
//!
//! This crate is still very much a work-in-progress. Expect breaking changes between minor
//! releases until `v1.0`.
//!

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

/// Types describing a map calibration and the pixel/geo conversions built on it
pub mod calibration;
/// Module containing types for OZF tile containers
pub mod container;
mod error;
mod map;
/// Transverse Mercator (UTM) projection math on the WGS84 ellipsoid
pub mod projection;
mod serde;
/// Web-mercator tile addressing and download pacing
pub mod tiles;
/// Planar transforms used by calibrations
pub mod transform;

pub use calibration::{Bounds, CorrespondencePoint, MapCalibration};
pub use container::{header::ContainerHeader, OzfContainer, TileBlock};
pub use error::Error;
pub use map::{sidecar_path, FirstCallProbe, LoadedMap};
pub use transform::TransformStrategy;

/// Width and height of a container tile, in pixels
pub const TILE_SIZE: u32 = 64;
