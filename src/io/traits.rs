use std::collections::VecDeque;
use std::io;

use thiserror::Error;

use crate::meta::InstrumentInfo;
use crate::scan::Scan;

use super::document::WriterResult;
use super::OffsetIndex;

#[derive(Debug, Error)]
pub enum ScanSourceError {
    #[error("An IO error occurred while reading scans: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },
}

/**
A producer of [`Scan`]s for a document writer.

Scans are handed out one at a time in ascending scan number order, fully
populated. [`ScanSource::total_count`] must be known before iteration starts
and must match the number of scans [`ScanSource::next_scan`] will produce.
*/
pub trait ScanSource {
    /// Produce the next scan, or `None` once the source is exhausted
    fn next_scan(&mut self) -> Result<Option<Scan>, ScanSourceError>;

    /// The number of scans this source will produce in total
    fn total_count(&self) -> u64;

    /// The instrument the scans were acquired on
    fn instrument_info(&self) -> &InstrumentInfo;

    /// Adapt this source into an [`Iterator`]
    fn iter(&mut self) -> ScanIterator<'_, Self>
    where
        Self: Sized,
    {
        ScanIterator { source: self }
    }
}

/// An [`Iterator`] over a [`ScanSource`], yielding errors in-band
pub struct ScanIterator<'a, S: ScanSource> {
    source: &'a mut S,
}

impl<S: ScanSource> Iterator for ScanIterator<'_, S> {
    type Item = Result<Scan, ScanSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next_scan().transpose()
    }
}

/// Common interface for document writers that consume [`Scan`]s
pub trait ScanWriter {
    /// Write out a single scan
    fn write_scan(&mut self, scan: &Scan) -> WriterResult<()>;

    /// Write the trailing index and checksum, completing the document
    fn close(&mut self) -> WriterResult<()>;

    /// The number of scans written so far
    fn scans_written(&self) -> u64;

    /// Consume an [`Iterator`] over [`Scan`] references
    fn write_all<'b, T: Iterator<Item = &'b Scan>>(&mut self, iterator: T) -> WriterResult<u64>
    where
        Self: Sized,
    {
        let mut n = 0;
        for scan in iterator {
            self.write_scan(scan)?;
            n += 1;
        }
        Ok(n)
    }
}

/// A [`ScanSource`] over scans already held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryScanSource {
    scans: VecDeque<Scan>,
    total: u64,
    instrument_info: InstrumentInfo,
    offsets: OffsetIndex,
}

impl MemoryScanSource {
    pub fn new(scans: VecDeque<Scan>, instrument_info: InstrumentInfo) -> Self {
        let mut offsets = OffsetIndex::new("scan");
        scans.iter().enumerate().for_each(|(i, s)| {
            offsets.insert(s.scan_number, i as u64);
        });
        Self {
            total: scans.len() as u64,
            scans,
            instrument_info,
            offsets,
        }
    }

    /// The position of each scan number in the original queue
    pub fn get_index(&self) -> &OffsetIndex {
        &self.offsets
    }

    /// The number of scans not yet handed out
    pub fn remaining(&self) -> usize {
        self.scans.len()
    }
}

impl ScanSource for MemoryScanSource {
    fn next_scan(&mut self) -> Result<Option<Scan>, ScanSourceError> {
        Ok(self.scans.pop_front())
    }

    fn total_count(&self) -> u64 {
        self.total
    }

    fn instrument_info(&self) -> &InstrumentInfo {
        &self.instrument_info
    }
}

impl<I: IntoIterator<Item = Scan>> From<(I, InstrumentInfo)> for MemoryScanSource {
    fn from((scans, info): (I, InstrumentInfo)) -> Self {
        Self::new(scans.into_iter().collect(), info)
    }
}
