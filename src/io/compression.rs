use std::io::{self, prelude::*, BufReader};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;

/// Whether `header` begins with the gzip magic number
pub fn is_gzipped(header: &[u8]) -> bool {
    header.starts_with(b"\x1f\x8b")
}

/// Whether `path` names a gzip file by its extension
pub fn is_gzipped_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Wrap `reader` in a gzip decoder if its first bytes carry the gzip magic number,
/// otherwise pass the bytes through unchanged.
pub fn decompress_if_gzipped<'a, R: Read + 'a>(reader: R) -> io::Result<Box<dyn Read + 'a>> {
    let mut reader = BufReader::new(reader);
    let header = reader.fill_buf()?;
    if is_gzipped(header) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
