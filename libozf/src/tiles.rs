use std::{
    f64::consts::PI,
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use bon::Builder;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::Bounds;

/// Web-mercator latitude limit
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Address of a web-mercator ("slippy map") tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Column, counted from 180°W
    pub x: u32,
    /// Row, counted from the north
    pub y: u32,
    /// Zoom level
    pub z: u8,
}

impl Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Deepest zoom level whose tile indices still fit a `u32`; deeper requests are clamped to it
pub const MAX_ZOOM: u8 = 32;

fn tiles_per_axis(zoom: u8) -> f64 {
    2_f64.powi(i32::from(zoom.min(MAX_ZOOM)))
}

/// Tile containing `(lon, lat)`, clamped to the grid of `zoom`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lon_lat_to_tile(lon: f64, lat: f64, zoom: u8) -> TileId {
    let zoom = zoom.min(MAX_ZOOM);
    let n = tiles_per_axis(zoom);
    let max_tile = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    TileId {
        x: x.clamp(0.0, max_tile) as u32,
        y: y.clamp(0.0, max_tile) as u32,
        z: zoom,
    }
}

/// `(lon, lat)` of the top-left corner of a tile
#[must_use]
pub fn tile_to_lon_lat(tile: TileId) -> (f64, f64) {
    let n = tiles_per_axis(tile.z);
    let lon = f64::from(tile.x) / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * f64::from(tile.y) / n)).sinh().atan();
    (lon, lat_rad.to_degrees())
}

/// Every tile of `zoom` touching `bounds`, row by row from the north-west corner
#[must_use]
pub fn tiles_in_bounds(bounds: Bounds, zoom: u8) -> Vec<TileId> {
    let zoom = zoom.min(MAX_ZOOM);
    let north_west = lon_lat_to_tile(bounds.west, bounds.north.min(MAX_LATITUDE), zoom);
    let south_east = lon_lat_to_tile(bounds.east, bounds.south.max(-MAX_LATITUDE), zoom);

    (north_west.y..=south_east.y)
        .cartesian_product(north_west.x..=south_east.x)
        .map(|(y, x)| TileId { x, y, z: zoom })
        .collect()
}

/// Something that can fetch a single tile, e.g. from a tile server
pub trait TileFetcher {
    /// Error returned by a failed fetch
    type Error: Display;

    /// Fetches one tile
    ///
    /// # Errors
    ///
    /// Whatever went wrong for this tile; the download carries on with the next one
    fn fetch(&mut self, tile: TileId) -> Result<(), Self::Error>;
}

impl<F, E> TileFetcher for F
where
    F: FnMut(TileId) -> Result<(), E>,
    E: Display,
{
    type Error = E;

    fn fetch(&mut self, tile: TileId) -> Result<(), Self::Error> {
        self(tile)
    }
}

/// Outcome of [`DownloadPlan::run`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    /// Tiles fetched successfully
    pub fetched: usize,
    /// Tiles whose fetch failed
    pub failed: usize,
    /// Whether the run stopped because the abort flag was set
    pub cancelled: bool,
}

/// A rate limited list of tiles to fetch
#[derive(Debug, Clone, Builder)]
pub struct DownloadPlan {
    tiles: Vec<TileId>,
    /// Minimum time between the start of two fetches
    #[builder(default = Duration::from_millis(500))]
    min_interval: Duration,
}

impl DownloadPlan {
    /// Plan covering `bounds` at `zoom`
    #[must_use]
    pub fn for_bounds(bounds: Bounds, zoom: u8) -> Self {
        Self::builder().tiles(tiles_in_bounds(bounds, zoom)).build()
    }

    /// Tiles in fetch order
    #[must_use]
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Minimum time between two fetches
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Fetches every tile in order.
    ///
    /// `abort` is checked before each tile. Fetches are spaced by at least the plan's minimum
    /// interval; failures are counted and do not stop the run.
    pub fn run<F: TileFetcher>(&self, fetcher: &mut F, abort: &AtomicBool) -> DownloadReport {
        info!(
            tiles = self.tiles.len(),
            interval_ms = self.min_interval.as_millis(),
            "Starting tile download"
        );
        let mut report = DownloadReport::default();
        let mut last_start: Option<Instant> = None;

        for &tile in &self.tiles {
            if abort.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            if let Some(wait) = last_start
                .map(|start| self.min_interval.saturating_sub(start.elapsed()))
                .filter(|wait| !wait.is_zero())
            {
                thread::sleep(wait);
            }
            last_start = Some(Instant::now());

            match fetcher.fetch(tile) {
                Ok(()) => report.fetched += 1,
                Err(e) => {
                    warn!(%tile, "Tile fetch failed: {e}");
                    report.failed += 1;
                }
            }
        }

        debug!(?report, "Tile download finished");
        report
    }
}
