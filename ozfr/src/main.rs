use ozfr::{covering_tiles, default_tile_output, describe, geo_to_pixel, pixel_to_geo, tile_to_png};
use std::path::PathBuf;
use tracing::{info, Level};

use anyhow::Result;
use clap::{Parser, Subcommand};

#[cfg(not(debug_assertions))]
const DEFAULT_DEBUG_LEVEL: u8 = 1;
#[cfg(debug_assertions)]
const DEFAULT_DEBUG_LEVEL: u8 = 2;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, default_value_t = DEFAULT_DEBUG_LEVEL, action = clap::ArgAction::Count)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// prints the calibration of a map and the header of its container
    Info {
        /// A container (.ozf2/.ozf3/.ozfx3) or a .map file
        path: PathBuf,
    },

    /// converts an image pixel to latitude/longitude
    #[command(name = "pixel2geo")]
    PixelToGeo {
        /// A container or a .map file
        map: PathBuf,
        px: f64,
        py: f64,
    },

    /// converts latitude/longitude to an image pixel
    #[command(name = "geo2pixel")]
    GeoToPixel {
        /// A container or a .map file
        map: PathBuf,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// extracts a single tile to a grayscale PNG
    Tile {
        /// The container
        container: PathBuf,
        x: u32,
        y: u32,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// lists the web-mercator tiles covering a map
    Tiles {
        /// A container or a .map file
        map: PathBuf,
        /// Zoom level
        #[arg(short, long)]
        zoom: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { path } => print!("{}", describe(&path)?),
        Commands::PixelToGeo { map, px, py } => {
            let (lat, lon) = pixel_to_geo(&map, px, py)?;
            println!("{lat:.8} {lon:.8}");
        }
        Commands::GeoToPixel { map, lat, lon } => {
            let (px, py) = geo_to_pixel(&map, lat, lon)?;
            println!("{px:.3} {py:.3}");
        }
        Commands::Tile {
            container,
            x,
            y,
            output,
        } => {
            let output = match output {
                Some(o) => o,
                None => {
                    let output = default_tile_output(&container, x, y)?;
                    info!("output name: {}", output.display());
                    output
                }
            };
            tile_to_png(&container, x, y, &output)?;
        }
        Commands::Tiles { map, zoom } => {
            let tiles = covering_tiles(&map, zoom)?;
            if let (Some(first), Some(last)) = (tiles.first(), tiles.last()) {
                println!(
                    "zoom {zoom}: x {}..={} y {}..={} ({} tiles)",
                    first.x,
                    last.x,
                    first.y,
                    last.y,
                    tiles.len()
                );
            }
            for tile in tiles {
                println!("{tile}");
            }
        }
    }
    Ok(())
}
