use std::fmt::Debug;
use std::fs;
use std::io::{self, prelude::*, BufWriter};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::compression::is_gzipped_extension;
use super::utils::SHA1HashingStream;

const BUFFER_SIZE: usize = 10000;

/// A writable stream that counts the bytes that reach it
#[derive(Debug)]
pub struct ByteCountingStream<W: Write> {
    stream: W,
    bytes_written: u64,
}

impl<W: Write> ByteCountingStream<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl<W: Write> Write for ByteCountingStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

enum SinkStream<W: Write> {
    Plain(BufWriter<ByteCountingStream<W>>),
    Gzip(GzEncoder<BufWriter<ByteCountingStream<W>>>),
}

impl<W: Write> SinkStream<W> {
    fn counter(&self) -> &ByteCountingStream<W> {
        match self {
            Self::Plain(stream) => stream.get_ref(),
            Self::Gzip(stream) => stream.get_ref().get_ref(),
        }
    }
}

impl<W: Write> Write for SinkStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Gzip(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Gzip(stream) => stream.flush(),
        }
    }
}

/**
The output sink of a document.

Bytes pass through a running SHA-1 digest and a logical byte counter before being
optionally gzip-compressed, so [`CountingSink::logical_position`] and
[`CountingSink::hexdigest`] describe the uncompressed document regardless of mode.
[`CountingSink::physical_position`] reports how many bytes have reached the
underlying writer, which lags behind while data sits in a buffer or the compressor.
*/
pub struct CountingSink<W: Write> {
    stream: SHA1HashingStream<SinkStream<W>>,
    logical_bytes: u64,
}

impl<W: Write> Debug for CountingSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingSink")
            .field("compressed", &self.is_compressed())
            .field("logical_bytes", &self.logical_bytes)
            .field("physical_bytes", &self.physical_position())
            .finish()
    }
}

impl<W: Write> CountingSink<W> {
    pub fn new(stream: W) -> Self {
        Self::wrap(SinkStream::Plain(BufWriter::with_capacity(
            BUFFER_SIZE,
            ByteCountingStream::new(stream),
        )))
    }

    pub fn new_gzipped(stream: W) -> Self {
        let inner = BufWriter::with_capacity(BUFFER_SIZE, ByteCountingStream::new(stream));
        Self::wrap(SinkStream::Gzip(GzEncoder::new(inner, Compression::default())))
    }

    fn wrap(stream: SinkStream<W>) -> Self {
        Self {
            stream: SHA1HashingStream::new(stream),
            logical_bytes: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.stream.get_ref(), SinkStream::Gzip(_))
    }

    /// The number of uncompressed bytes accepted so far
    pub fn logical_position(&self) -> u64 {
        self.logical_bytes
    }

    /// The number of bytes that have reached the underlying writer
    pub fn physical_position(&self) -> u64 {
        self.stream.get_ref().counter().bytes_written()
    }

    /// The SHA-1 digest of the uncompressed bytes accepted so far
    pub fn hexdigest(&self) -> String {
        self.stream.hexdigest()
    }

    /// Terminate the compressed stream if there is one, flush everything and
    /// return the underlying writer
    pub fn finish(self) -> io::Result<W> {
        let buffered = match self.stream.into_inner() {
            SinkStream::Plain(stream) => stream,
            SinkStream::Gzip(stream) => stream.finish()?,
        };
        let counter = buffered.into_inner().map_err(|e| e.into_error())?;
        let mut stream = counter.into_inner();
        stream.flush()?;
        Ok(stream)
    }
}

impl CountingSink<fs::File> {
    /// Create the file at `path`, compressing its contents when the path ends in `.gz`.
    pub fn create_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let handle = fs::File::create(path)?;
        if is_gzipped_extension(path) {
            Ok(Self::new_gzipped(handle))
        } else {
            Ok(Self::new(handle))
        }
    }
}

impl<W: Write> Write for CountingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.logical_bytes += n as u64;
        Ok(n)
    }

    /// Push all buffered bytes to the underlying writer. In gzip mode this performs a
    /// sync flush, so everything accepted so far can be decompressed from the output.
    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
