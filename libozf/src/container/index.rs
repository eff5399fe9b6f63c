use std::{
    collections::HashMap,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use tracing::{debug, trace};

use crate::Error;

use super::{header::ContainerHeader, truncated};

static OFFSET_TABLES: LazyLock<Mutex<HashMap<PathBuf, Arc<TileOffsetTable>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Byte offsets of every tile of the full resolution level.
///
/// Holds `tiles_x * tiles_y + 1` entries: tile `i` spans `offsets[i]..offsets[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct TileOffsetTable {
    /// Absolute offset of the table in the container
    pub table_offset: u32,
    /// Number of tile columns
    pub tiles_x: u32,
    /// Number of tile rows
    pub tiles_y: u32,
    /// Start offset of every tile, followed by the end of the last one
    pub offsets: Vec<u32>,
}

impl TileOffsetTable {
    /// Byte range of a tile, `None` outside the grid
    #[must_use]
    pub fn span(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        if x >= self.tiles_x || y >= self.tiles_y {
            return None;
        }
        let i = y as usize * self.tiles_x as usize + x as usize;
        Some((*self.offsets.get(i)?, *self.offsets.get(i + 1)?))
    }
}

/// Reads the `tiles_x * tiles_y + 1` offsets the header points at
///
/// # Errors
///
/// [`Error::TruncatedData`] if the table runs past the end of the file
#[allow(clippy::module_name_repetitions)]
pub fn read_offset_table(
    r: &mut (impl Read + Seek),
    header: &ContainerHeader,
) -> Result<TileOffsetTable, Error> {
    let entries = header.tile_count() + 1;
    let end = r.seek(SeekFrom::End(0))?;
    // every entry is a little-endian u32
    let table_end = u64::from(header.table_offset) + entries as u64 * 4;
    if table_end > end {
        return Err(truncated(format!(
            "offset table of {entries} entries at {} exceeds {end} bytes",
            header.table_offset
        )));
    }

    r.seek(SeekFrom::Start(u64::from(header.table_offset)))?;
    let mut raw = vec![0; entries * 4];
    r.read_exact(&mut raw)
        .map_err(|_| truncated("tile offset table"))?;

    let offsets: Vec<u32> = raw
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    trace!(?offsets, "Tile offsets");

    Ok(TileOffsetTable {
        table_offset: header.table_offset,
        tiles_x: header.tiles_x,
        tiles_y: header.tiles_y,
        offsets,
    })
}

/// Reads the offset table of the container at `path`, or returns the one read earlier.
///
/// Entries live for the rest of the process.
pub fn cached_offset_table(
    path: &Path,
    r: &mut (impl Read + Seek),
    header: &ContainerHeader,
) -> Result<Arc<TileOffsetTable>, Error> {
    if let Some(table) = OFFSET_TABLES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(path)
        .filter(|t| t.table_offset == header.table_offset)
    {
        debug!(path = %path.display(), "Offset table cache hit");
        return Ok(Arc::clone(table));
    }

    let table = Arc::new(read_offset_table(r, header)?);
    OFFSET_TABLES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(path.to_path_buf(), Arc::clone(&table));
    Ok(table)
}
