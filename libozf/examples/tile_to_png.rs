/// Demonstrates how to write every tile of an OZF map as a grayscale png
/// using the [`image`] crate
///
use std::sync::atomic::AtomicBool;

use itertools::Itertools;
use libozf::LoadedMap;

fn main() -> anyhow::Result<()> {
    let map = LoadedMap::open("../test_assets/alps.ozf2")?;
    let header = map.container().header();
    println!(
        "{}: {}x{} pixels, bounds {:?}",
        map.name(),
        header.width,
        header.height,
        map.calibration().bounds()
    );

    let coords = (0..header.tiles_y).cartesian_product(0..header.tiles_x).map(|(y, x)| (x, y));
    for ((x, y), tile) in map.container().extract_tiles(coords, &AtomicBool::new(false)) {
        match tile.map(|t| t.as_luma_image()) {
            Ok(Some(image)) => image.save(format!("tile_{x}_{y}.png"))?,
            Ok(None) => println!("tile ({x}, {y}) is not an 8-bit tile"),
            Err(e) => println!("tile ({x}, {y}): {e}"),
        }
    }
    Ok(())
}
