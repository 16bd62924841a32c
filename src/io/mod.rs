//! Writing indexed mass spectrometry documents and the sources that feed them.
//!
//! A [`ScanSource`] hands out [`Scan`](crate::scan::Scan)s one at a time, a document
//! writer ([`MzMLWriterType`] or [`MzXMLWriterType`]) streams them through an
//! [`XMLElementWriter`] into a [`CountingSink`], and [`convert()`] ties the two together.

pub(crate) mod compression;
pub mod convert;
mod document;
#[cfg(feature = "mgf")]
pub mod mgf;
pub mod mzml;
pub mod mzxml;
mod offset_index;
mod sink;
pub(crate) mod traits;
mod utils;
pub mod xml_writer;

pub use crate::io::compression::{decompress_if_gzipped, is_gzipped, is_gzipped_extension};

pub use crate::io::convert::{
    condition_scan, convert, convert_to_path, ConversionConfig, ConversionError, ConversionStats,
    DocumentFormat,
};

pub use crate::io::document::{
    format_duration, DocumentMetadata, DocumentState, WriterError, WriterResult,
};

#[cfg(feature = "mgf")]
pub use crate::io::mgf::{MGFError, MGFScanDefaults, MGFScanSource};

pub use crate::io::mzml::{MzMLWriter, MzMLWriterType};
pub use crate::io::mzxml::{should_close_before, MzXMLWriter, MzXMLWriterType, ScanNesting};

pub use crate::io::offset_index::OffsetIndex;
pub use crate::io::sink::{ByteCountingStream, CountingSink};
pub use crate::io::traits::{
    MemoryScanSource, ScanIterator, ScanSource, ScanSourceError, ScanWriter,
};
pub use crate::io::utils::{checksum_file, SHA1HashingStream};
pub use crate::io::xml_writer::{XMLElementWriter, XMLResult, XMLWriterError};
