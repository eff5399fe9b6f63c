use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use tracing::trace;

use crate::Error;

/// Inflates a single tile.
///
/// Tiles are zlib streams; raw deflate streams are accepted as well.
pub fn inflate_tile(data: &[u8], expected_len: usize) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(expected_len);
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(zlib_err) => {
            trace!("zlib inflate failed ({zlib_err}), retrying as raw deflate");
            out.clear();
            DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(Error::DecompressionFailed)?;
            Ok(out)
        }
    }
}
