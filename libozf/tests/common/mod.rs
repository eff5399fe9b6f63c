#![allow(dead_code)]

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use flate2::{
    write::{DeflateEncoder, ZlibEncoder},
    Compression,
};
use mktemp::Temp;

pub const MAGIC_OZF2: u16 = 0x7778;
pub const MAGIC_OZF3: u16 = 0x7780;
pub const MAGIC_OZFX3: u16 = 0x7781;

/// Two degree points at opposite corners of a 1000x800 image
pub const TWO_POINT_SIDECAR: &str = "OziExplorer Map Data File Version 2.2\r
Two points\r
two_points.ozf2\r
1 ,Map Code,\r
WGS 84,WGS 84,   0.0000,   0.0000,WGS 84\r
Reserved 1\r
Reserved 2\r
Magnetic Variation,,,E\r
Map Projection,Latitude/Longitude,PolyCal,No,AutoCalOnly,No,BSBUseWPX,No\r
Point01,xy,    0,    0,in, deg,  46,  0.0000,N,   7,  0.0000,E, grid,   ,           ,           ,N\r
Point02,xy, 1000,  800,in, deg,  45,  0.0000,N,   8,  0.0000,E, grid,   ,           ,           ,N\r
Point03,xy,     ,     ,in, deg,    ,        ,N,    ,        ,E, grid,   ,           ,           ,N\r
IWH,Map Image Width/Height,1000,800\r
";

/// No points and no corners, only the header
pub const EMPTY_SIDECAR: &str = "OziExplorer Map Data File Version 2.2\r
Empty\r
empty.ozf2\r
1 ,Map Code,\r
\r
";

/// Four `MMPLL` corners backed by four `MMPXY` corners on a 1000x800 image, corners listed
/// top-left, top-right, bottom-right, bottom-left
pub const CORNER_SIDECAR: &str = "OziExplorer Map Data File Version 2.2\r
Corners\r
corners.ozf3\r
1 ,Map Code,\r
WGS 84,WGS 84,   0.0000,   0.0000,WGS 84\r
Map Projection,Mercator,PolyCal,No,AutoCalOnly,No,BSBUseWPX,No\r
Point01,xy,   10,   10,in, deg,  47, 59.4000,N,  10,  0.6000,E, grid,   ,           ,           ,N\r
Point02,xy,  990,  790,in, deg,  47,  0.6000,N,  10, 59.4000,E, grid,   ,           ,           ,N\r
MMPNUM,4\r
MMPXY,1,0,0\r
MMPXY,2,1000,0\r
MMPXY,3,1000,800\r
MMPXY,4,0,800\r
MMPLL,1,  10.000000,  48.000000\r
MMPLL,2,  11.000000,  48.010000\r
MMPLL,3,  11.010000,  47.000000\r
MMPLL,4,   9.990000,  46.990000\r
IWH,Map Image Width/Height,1000,800\r
";

/// Three grid points in UTM zone 33 on a 2000x1500 image, ten metres per pixel
pub const UTM_SIDECAR: &str = "OziExplorer Map Data File Version 2.2\r
UTM 33\r
utm.ozfx3\r
1 ,Map Code,\r
WGS 84,WGS 84,   0.0000,   0.0000,WGS 84\r
Map Projection,(UTM) Universal Transverse Mercator,PolyCal,No,AutoCalOnly,No,BSBUseWPX,No\r
Point01,xy,    0,    0,in, deg,    ,        ,N,    ,        ,E, grid,  33,   490000,  5215000,N\r
Point02,xy, 2000,    0,in, deg,    ,        ,N,    ,        ,E, grid,  33,   510000,  5215000,N\r
Point03,xy, 2000, 1500,in, deg,    ,        ,N,    ,        ,E, grid,  33,   510000,  5200000,N\r
IWH,Map Image Width/Height,2000,1500\r
";

/// A 64x64 tile of `(x + y + seed) mod 256`
pub fn tile_pattern(seed: u8) -> Vec<u8> {
    (0..64u32)
        .flat_map(|y| (0..64u32).map(move |x| ((x + y) as u8).wrapping_add(seed)))
        .collect()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory write")
}

pub fn raw_deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory write")
}

/// Lays out compressed tiles after `header`, followed by the offset table.
///
/// Returns the file so far and the table offset.
fn tiles_and_table(mut file: Vec<u8>, payloads: &[Vec<u8>]) -> (Vec<u8>, u32) {
    let mut offsets = Vec::with_capacity(payloads.len() + 1);
    for payload in payloads {
        offsets.push(file.len() as u32);
        file.extend_from_slice(payload);
    }
    offsets.push(file.len() as u32);

    let table_offset = file.len() as u32;
    for offset in offsets {
        file.extend_from_slice(&offset.to_le_bytes());
    }
    (file, table_offset)
}

/// A version 2 container with a 14 byte header
pub fn build_ozf2(width: u32, height: u32, payloads: &[Vec<u8>]) -> Vec<u8> {
    let (mut file, table_offset) = tiles_and_table(vec![0; 14], payloads);
    file[0..2].copy_from_slice(&MAGIC_OZF2.to_le_bytes());
    file[2..6].copy_from_slice(&table_offset.to_le_bytes());
    file[6..10].copy_from_slice(&width.to_le_bytes());
    file[10..14].copy_from_slice(&height.to_le_bytes());
    file
}

/// A version 3 container: long header, table pointer in the last 4 bytes
pub fn build_ozf3(width: u32, height: u32, payloads: &[Vec<u8>]) -> Vec<u8> {
    build_long_header(MAGIC_OZF3, width, height, payloads)
}

/// A version 4 (`.ozfx3`) container, laid out like version 3
pub fn build_ozfx3(width: u32, height: u32, payloads: &[Vec<u8>]) -> Vec<u8> {
    build_long_header(MAGIC_OZFX3, width, height, payloads)
}

fn build_long_header(magic: u16, width: u32, height: u32, payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut header = vec![0; 30];
    header[0..2].copy_from_slice(&magic.to_le_bytes());
    header[6..8].copy_from_slice(&64u16.to_le_bytes());
    header[14..18].copy_from_slice(&40u32.to_le_bytes());
    header[18..22].copy_from_slice(&width.to_le_bytes());
    header[22..26].copy_from_slice(&height.to_le_bytes());
    header[26..28].copy_from_slice(&1u16.to_le_bytes());
    header[28..30].copy_from_slice(&8u16.to_le_bytes());

    let (mut file, table_offset) = tiles_and_table(header, payloads);
    file.extend_from_slice(&table_offset.to_le_bytes());
    file
}

/// A 128x128 version 2 container holding four zlib tiles seeded 0, 1, 2 and 3
pub fn four_tile_ozf2() -> Vec<u8> {
    let payloads: Vec<Vec<u8>> = (0..4).map(|seed| zlib(&tile_pattern(seed))).collect();
    build_ozf2(128, 128, &payloads)
}

pub fn temp_file_with(bytes: &[u8]) -> anyhow::Result<Temp> {
    let file = Temp::new_file()?;
    let path: &Path = file.as_ref();
    fs::write(path, bytes)?;
    Ok(file)
}

/// Writes `<dir>/<name>` and returns its path
pub fn write_into(dir: &Temp, name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let dir: &Path = dir.as_ref();
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}
