use std::{
    fmt::Write as _,
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use image::{codecs::png::PngEncoder, ImageEncoder};
use libozf::{
    sidecar_path,
    tiles::{tiles_in_bounds, TileId},
    transform::Corner,
    MapCalibration, OzfContainer,
};
use tracing::{debug, info, instrument};

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("map"))
}

/// Reads the calibration of `path`, which is either a `.map` file or a container next to one
#[instrument]
pub fn load_calibration(path: &Path) -> Result<MapCalibration> {
    let sidecar = if is_sidecar(path) {
        path.to_path_buf()
    } else {
        sidecar_path(path)?
    };
    debug!("Reading calibration from {}", sidecar.display());
    MapCalibration::from_file(&sidecar)
        .with_context(|| format!("Unable to read {}", sidecar.display()))
}

/// Human readable summary of a map, its calibration and (if present) its container
#[instrument]
pub fn describe(path: &Path) -> Result<String> {
    let mut out = String::new();

    match load_calibration(path) {
        Ok(calibration) => write_calibration(&mut out, &calibration)?,
        Err(e) if is_sidecar(path) => return Err(e),
        Err(e) => info!("No calibration: {e:#}"),
    }

    if !is_sidecar(path) {
        let container = OzfContainer::open(path)
            .with_context(|| format!("Unable to open container {}", path.display()))?;
        let header = container.header();
        writeln!(out, "container: ozf version {}", header.version)?;
        writeln!(out, "  magic: {:#06x}", header.magic)?;
        writeln!(out, "  size: {}x{}", header.width, header.height)?;
        writeln!(out, "  bit depth: {}", header.bit_depth)?;
        writeln!(
            out,
            "  tiles: {}x{} of {}x{}",
            header.tiles_x, header.tiles_y, header.tile_width, header.tile_height
        )?;
        writeln!(out, "  offset table at: {}", header.table_offset)?;
    }
    Ok(out)
}

fn write_calibration(out: &mut String, calibration: &MapCalibration) -> Result<()> {
    writeln!(out, "title: {}", calibration.title())?;
    writeln!(out, "image: {}", calibration.image_path())?;
    writeln!(out, "datum: {}", calibration.datum())?;
    writeln!(out, "projection: {}", calibration.projection())?;
    writeln!(
        out,
        "size: {}x{}",
        calibration.image_width(),
        calibration.image_height()
    )?;
    writeln!(out, "points: {}", calibration.correspondences().len())?;

    let bounds = calibration.bounds();
    writeln!(
        out,
        "bounds ({}): N {:.6} S {:.6} E {:.6} W {:.6}",
        calibration.bounds_source(),
        bounds.north,
        bounds.south,
        bounds.east,
        bounds.west
    )?;
    writeln!(
        out,
        "strategy: {} (inverse {})",
        calibration.forward_strategy(),
        calibration.inverse_strategy()
    )?;
    if let Some(utm) = calibration.utm_calibration() {
        let hemisphere = if utm.southern { 'S' } else { 'N' };
        writeln!(out, "utm zone: {}{hemisphere}", utm.zone)?;
    }
    for corner in [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ] {
        if let Some((lat, lon)) = calibration.corner(corner) {
            writeln!(out, "{corner:?}: {lat:.6}, {lon:.6}")?;
        }
    }
    Ok(())
}

/// Converts an image pixel of `map` to `(lat, lon)`
#[instrument]
pub fn pixel_to_geo(map: &Path, px: f64, py: f64) -> Result<(f64, f64)> {
    let calibration = load_calibration(map)?;
    debug!(strategy = %calibration.forward_strategy());
    Ok(calibration.pixel_to_geo(px, py))
}

/// Converts `(lat, lon)` to an image pixel of `map`
#[instrument]
pub fn geo_to_pixel(map: &Path, lat: f64, lon: f64) -> Result<(f64, f64)> {
    let calibration = load_calibration(map)?;
    debug!(strategy = %calibration.inverse_strategy());
    Ok(calibration.geo_to_pixel(lat, lon))
}

/// Default output name for a tile: `<dir>/<stem>_<x>_<y>.png`
pub fn default_tile_output(container: &Path, x: u32, y: u32) -> Result<PathBuf> {
    let Some(dir) = container.parent() else {
        bail!("Invalid container file");
    };
    let Some(Some(stem)) = container.file_stem().map(|os| os.to_str()) else {
        bail!("Invalid container file");
    };
    Ok(dir.join(format!("{stem}_{x}_{y}.png")))
}

/// Extracts tile `(x, y)` of `container` and writes it as a grayscale PNG of palette indices
#[instrument]
pub fn tile_to_png(container: &Path, x: u32, y: u32, output_name: &Path) -> Result<()> {
    let container = OzfContainer::open(container)?;
    let tile = container.extract_tile(x, y)?;
    debug!("Extracted tile of {} bytes", tile.len());

    let Some(luma) = tile.as_luma_image() else {
        bail!(
            "Tile ({x}, {y}) holds {} bytes, not an 8-bit {}x{} block",
            tile.len(),
            libozf::TILE_SIZE,
            libozf::TILE_SIZE
        );
    };

    let output = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(output_name)?;

    info!("Writing tile to {}", output_name.display());
    PngEncoder::new(output).write_image(
        luma.as_raw(),
        luma.width(),
        luma.height(),
        image::ExtendedColorType::L8,
    )?;
    info!("Successfully wrote tile to {}", output_name.display());
    Ok(())
}

/// Slippy tiles of `zoom` covering the bounds of `map`
#[instrument]
pub fn covering_tiles(map: &Path, zoom: u8) -> Result<Vec<TileId>> {
    if zoom > 30 {
        bail!("Zoom level {zoom} is out of range (0-30)");
    }
    let calibration = load_calibration(map)?;
    let tiles = tiles_in_bounds(calibration.bounds(), zoom);
    info!("{} tiles at zoom {zoom}", tiles.len());
    Ok(tiles)
}
