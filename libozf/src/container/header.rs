use std::io::{Read, Seek, SeekFrom};

use bon::Builder;
use nom::{
    bytes::complete::take,
    number::complete::{le_u16, le_u32},
    sequence::tuple,
    IResult,
};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::{Error, TILE_SIZE};

use super::truncated;

/// Magic number of `.ozf2` containers
pub const MAGIC_OZF2: u16 = 0x7778;
/// Magic number of `.ozf3` containers
pub const MAGIC_OZF3: u16 = 0x7780;
/// Magic number of `.ozfx3` containers
pub const MAGIC_OZFX3: u16 = 0x7781;

/// Size of the header shared by every version
pub const SHORT_HEADER_LEN: usize = 14;
/// Size of the header of version 3/4 containers, including the image info block
pub const LONG_HEADER_LEN: usize = 30;

/// Container layout version, selected by the magic number
#[derive(Debug, Display, IntoStaticStr, Eq, PartialEq, PartialOrd, Ord, Copy, Clone)]
pub enum Version {
    /// `.ozf2`: 14 byte header holding the table pointer and the image size
    #[strum(serialize = "2")]
    Two,
    /// `.ozf3`: long header, table pointer at the end of the file
    #[strum(serialize = "3")]
    Three,
    /// `.ozfx3`: same layout as version 3
    #[strum(serialize = "4")]
    Four,
}

impl TryFrom<u16> for Version {
    type Error = Error;

    fn try_from(magic: u16) -> Result<Self, Self::Error> {
        match magic {
            MAGIC_OZF2 => Ok(Self::Two),
            MAGIC_OZF3 => Ok(Self::Three),
            MAGIC_OZFX3 => Ok(Self::Four),
            _ => Err(Error::FormatUnrecognized { magic }),
        }
    }
}

/// Header of an OZF container.
///
/// Two layouts exist. Version 2 uses a 14 byte header:
/// ```"not rust"
/// 0x00 u16 magic
/// 0x02 u32 offset of the tile offset table
/// 0x06 u32 image width
/// 0x0A u32 image height
/// ```
/// Versions 3 and 4 keep the magic at offset 0 and follow the 14 byte block with an image info
/// block; the table offset is stored in the last 4 bytes of the file:
/// ```"not rust"
/// 0x00 u16 magic
/// 0x02 u32 lock flag
/// 0x06 u16 tile width
/// 0x08 u16 format version
/// 0x0A u32 size of the previous header
/// 0x0E u32 size of the info block
/// 0x12 u32 image width
/// 0x16 u32 image height
/// 0x1A u16 planes
/// 0x1C u16 bits per pixel
/// ```
/// All values are little-endian. Tiles are always 64x64 pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[non_exhaustive]
pub struct ContainerHeader {
    /// Magic number found at offset 0
    pub magic: u16,
    /// Layout version selected by [`Self::magic`]
    pub version: Version,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Bits per pixel
    #[builder(default = 8)]
    pub bit_depth: u16,
    /// Tile width in pixels
    #[builder(default = TILE_SIZE)]
    pub tile_width: u32,
    /// Tile height in pixels
    #[builder(default = TILE_SIZE)]
    pub tile_height: u32,
    /// Number of tile columns
    pub tiles_x: u32,
    /// Number of tile rows
    pub tiles_y: u32,
    /// Number of zoom levels addressed by this header (only the full resolution level)
    #[builder(default = 1)]
    pub zoom_levels: u32,
    /// Absolute offset of the tile offset table
    pub table_offset: u32,
}

impl ContainerHeader {
    /// Number of tiles at full resolution
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }
}

/// `ceil(extent / 64)`
#[must_use]
pub const fn tiles_for(extent: u32) -> u32 {
    extent.div_ceil(TILE_SIZE)
}

fn short_header(input: &[u8]) -> IResult<&[u8], (u16, u32, u32, u32)> {
    tuple((le_u16, le_u32, le_u32, le_u32))(input)
}

fn long_header(input: &[u8]) -> IResult<&[u8], (u16, u32, u32, u16)> {
    let (input, (magic, _skipped)) = tuple((le_u16, take(16usize)))(input)?;
    let (input, (width, height, _planes, bits_per_pixel)) =
        tuple((le_u32, le_u32, le_u16, le_u16))(input)?;
    Ok((input, (magic, width, height, bits_per_pixel)))
}

/// Reads the header at the start of `r`.
///
/// For version 3/4 containers this also seeks to the end of the file to find the table offset.
///
/// # Errors
///
/// - [`Error::FormatUnrecognized`] if the magic number is not known
/// - [`Error::TruncatedData`] if the file is shorter than its header
pub fn read_header(r: &mut (impl Read + Seek)) -> Result<ContainerHeader, Error> {
    r.rewind()?;
    let mut prefix = Vec::with_capacity(LONG_HEADER_LEN);
    r.by_ref()
        .take(LONG_HEADER_LEN as u64)
        .read_to_end(&mut prefix)?;
    debug!("read {} header bytes", prefix.len());

    let Ok((_, magic)) = le_u16::<_, ()>(prefix.as_slice()) else {
        return Err(truncated("container magic"));
    };
    let version = Version::try_from(magic)?;

    let (width, height, bit_depth, table_offset) = match version {
        Version::Two => {
            let (_, (_, table_offset, width, height)) =
                short_header(&prefix).map_err(|_| truncated("short container header"))?;
            (width, height, 8, table_offset)
        }
        Version::Three | Version::Four => {
            let (_, (_, width, height, bits_per_pixel)) =
                long_header(&prefix).map_err(|_| truncated("long container header"))?;
            r.seek(SeekFrom::End(-4))
                .map_err(|_| truncated("container table pointer"))?;
            let mut pointer = [0; 4];
            r.read_exact(&mut pointer)
                .map_err(|_| truncated("container table pointer"))?;
            (width, height, bits_per_pixel, u32::from_le_bytes(pointer))
        }
    };

    let header = ContainerHeader::builder()
        .magic(magic)
        .version(version)
        .width(width)
        .height(height)
        .bit_depth(bit_depth)
        .tiles_x(tiles_for(width))
        .tiles_y(tiles_for(height))
        .table_offset(table_offset)
        .build();
    debug!(?header, "Read container header");
    Ok(header)
}
