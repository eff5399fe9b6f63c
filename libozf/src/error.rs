use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
/// Possible `libozf` errors
pub enum Error {
    /// Error returned if the container does not start with a known magic number
    #[error("unrecognized container format (magic {magic:#06x})")]
    FormatUnrecognized {
        /// The magic number found at offset 0
        magic: u16,
    },
    /// Error returned when a read runs past the end of the file or a buffer is too short
    #[error("truncated data: {context}")]
    TruncatedData {
        /// What was being read
        context: String,
    },
    /// Error returned if a tile payload is not a valid DEFLATE stream
    #[error("tile decompression failed")]
    DecompressionFailed(#[source] io::Error),
    /// Error returned if the requested tile lies outside the tile grid or offset table
    #[error("tile ({x}, {y}) out of range for a {tiles_x}x{tiles_y} grid")]
    TileOutOfRange {
        /// requested column
        x: u32,
        /// requested row
        y: u32,
        /// columns in the grid
        tiles_x: u32,
        /// rows in the grid
        tiles_y: u32,
    },
    /// Error returned if the offset table gives a tile no compressed bytes
    #[error("tile ({x}, {y}) has no compressed payload")]
    EmptyTile {
        /// requested column
        x: u32,
        /// requested row
        y: u32,
    },
    /// Error returned if no `.map` file could be found next to a container
    #[error("no calibration file found for {}", .0.display())]
    SidecarNotFound(PathBuf),
    /// Error returned when a batch operation is aborted through its abort flag
    #[error("operation cancelled")]
    Cancelled,
    /// I/O error
    #[error(transparent)]
    Io(#[from] io::Error),
}
