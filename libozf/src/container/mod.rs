#![allow(clippy::module_name_repetitions)]

pub(crate) mod decompress;
/// Container header and magic numbers
pub mod header;
/// Tile offset table
pub mod index;

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use image::GrayImage;
use tracing::{debug, info, instrument, trace, warn};

use crate::{Error, TILE_SIZE};
use decompress::inflate_tile;
use header::{read_header, ContainerHeader};
use index::{cached_offset_table, read_offset_table, TileOffsetTable};

pub(crate) fn truncated(context: impl Into<String>) -> Error {
    Error::TruncatedData {
        context: context.into(),
    }
}

/// A decompressed 64x64 tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBlock {
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
    bytes: Vec<u8>,
}

impl TileBlock {
    /// Number of decompressed bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the tile decompressed to nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The decompressed bytes, as stored in the container
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Takes the decompressed bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Views the tile as an 8-bit grayscale image of palette indices.
    ///
    /// Returns `None` unless the tile holds exactly one byte per pixel.
    #[must_use]
    pub fn as_luma_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(TILE_SIZE, TILE_SIZE, self.bytes.clone())
            .filter(|_| self.bytes.len() == (TILE_SIZE * TILE_SIZE) as usize)
    }
}

/// An open OZF container.
///
/// Reads are serialized on the underlying reader; decompression is not, so tiles can be
/// extracted from several threads at once.
#[derive(Debug)]
pub struct OzfContainer<R = BufReader<File>> {
    path: Option<PathBuf>,
    header: ContainerHeader,
    table: Arc<TileOffsetTable>,
    reader: Mutex<R>,
}

impl OzfContainer<BufReader<File>> {
    /// Opens the container at `path`.
    ///
    /// The offset table is cached per canonical path for the rest of the process, so
    /// reopening a container only reads its header.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be opened
    /// - [`Error::FormatUnrecognized`] if the file does not start with a known magic number
    /// - [`Error::TruncatedData`] if the header or offset table is cut short
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().canonicalize()?;
        let mut reader = BufReader::new(File::open(&path)?);
        let header = read_header(&mut reader)?;
        let table = cached_offset_table(&path, &mut reader, &header)?;
        info!(
            version = %header.version,
            width = header.width,
            height = header.height,
            tiles_x = header.tiles_x,
            tiles_y = header.tiles_y,
            "Opened container"
        );
        Ok(Self {
            path: Some(path),
            header,
            table,
            reader: Mutex::new(reader),
        })
    }
}

impl<R: Read + Seek> OzfContainer<R> {
    /// Reads a container from any seekable source. Nothing is cached.
    ///
    /// # Errors
    ///
    /// Same as [`OzfContainer::open`]
    pub fn from_reader(mut reader: R) -> Result<Self, Error> {
        let header = read_header(&mut reader)?;
        let table = Arc::new(read_offset_table(&mut reader, &header)?);
        Ok(Self {
            path: None,
            header,
            table,
            reader: Mutex::new(reader),
        })
    }

    /// Canonical path of the container, if it was opened from a file
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Container header
    #[must_use]
    pub const fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Start offset of every tile, followed by the end of the last tile
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.table.offsets
    }

    /// Extracts and decompresses the tile at column `x`, row `y` of the full resolution level.
    ///
    /// # Errors
    ///
    /// - [`Error::TileOutOfRange`] if `(x, y)` is outside the tile grid
    /// - [`Error::EmptyTile`] if the offset table gives the tile no bytes
    /// - [`Error::TruncatedData`] if the tile runs past the end of the file
    /// - [`Error::DecompressionFailed`] if the tile is not a valid deflate stream
    pub fn extract_tile(&self, x: u32, y: u32) -> Result<TileBlock, Error> {
        let (start, end) = self.table.span(x, y).ok_or(Error::TileOutOfRange {
            x,
            y,
            tiles_x: self.header.tiles_x,
            tiles_y: self.header.tiles_y,
        })?;
        let Some(size) = end.checked_sub(start).filter(|&s| s > 0) else {
            warn!(x, y, start, end, "Tile has no payload");
            return Err(Error::EmptyTile { x, y });
        };

        let mut compressed = vec![0; size as usize];
        {
            let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
            reader.seek(SeekFrom::Start(u64::from(start)))?;
            reader.read_exact(&mut compressed).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    truncated(format!("tile ({x}, {y}) at {start}..{end}"))
                } else {
                    Error::Io(e)
                }
            })?;
        }

        let expected = (self.header.tile_width * self.header.tile_height) as usize;
        let bytes = inflate_tile(&compressed, expected)?;
        trace!(x, y, compressed = size, inflated = bytes.len(), "Extracted tile");
        Ok(TileBlock { x, y, bytes })
    }

    /// Extracts several tiles, checking `abort` before each one.
    ///
    /// Every tile gets its own result, so one bad tile does not stop the batch. Once `abort`
    /// is set the next tile yields [`Error::Cancelled`] and the batch ends there.
    pub fn extract_tiles(
        &self,
        coords: impl IntoIterator<Item = (u32, u32)>,
        abort: &AtomicBool,
    ) -> Vec<((u32, u32), Result<TileBlock, Error>)> {
        let mut results = Vec::new();
        for (x, y) in coords {
            if abort.load(Ordering::Relaxed) {
                debug!(x, y, done = results.len(), "Tile extraction cancelled");
                results.push(((x, y), Err(Error::Cancelled)));
                break;
            }
            results.push(((x, y), self.extract_tile(x, y)));
        }
        results
    }
}
