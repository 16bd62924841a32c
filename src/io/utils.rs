use std::fs;
use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};

use super::compression::decompress_if_gzipped;

/// A writable stream that keeps a running SHA-1 checksum of all bytes
/// accepted by the wrapped stream
#[derive(Clone)]
pub struct SHA1HashingStream<T: io::Write> {
    pub stream: T,
    pub context: Sha1,
}

impl<T: io::Write> SHA1HashingStream<T> {
    pub fn new(stream: T) -> SHA1HashingStream<T> {
        Self {
            stream,
            context: Sha1::new(),
        }
    }

    /// The lowercase hexadecimal digest of everything written so far.
    /// The stream may keep being written to afterwards.
    pub fn hexdigest(&self) -> String {
        let digest = self.context.clone().finalize();
        base16ct::lower::encode_string(&digest)
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T: io::Write> io::Write for SHA1HashingStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.context.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/**
Compute the lowercase hexadecimal SHA-1 digest of the file at `path`.

Gzip-compressed files are decompressed on the fly, so the digest of a compressed
document matches the digest of its decompressed contents.
*/
pub fn checksum_file<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let handle = fs::File::open(path)?;
    let mut reader = decompress_if_gzipped(handle)?;
    let mut hasher = SHA1HashingStream::new(io::sink());
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.hexdigest())
}
