//! `mzconvert` serializes mass spectrometry scans into indexed, checksummed mzML 0.99.1
//! and mzXML 3.1 documents.
//!
//! Scans come from a [`ScanSource`](crate::io::ScanSource), are optionally conditioned
//! by the [`signal`] routines, and are streamed by one of the document writers in
//! [`io`], which record the byte offset of every scan and finish with a SHA-1 digest
//! of the document.
//!
//! ```no_run
//! use mzconvert::io::{convert_to_path, ConversionConfig, DocumentFormat, DocumentMetadata, MGFScanSource};
//! use mzconvert::io::ScanSource;
//! use mzconvert::meta::SourceFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = MGFScanSource::open_path("./test/data/small.mgf")?;
//! let metadata = DocumentMetadata::new(source.instrument_info().clone())
//!     .with_source_file(SourceFile::from_path("./test/data/small.mgf", None)?)
//!     .with_run(source.run_info());
//! let config = ConversionConfig::new(DocumentFormat::MzXML);
//! let stats = convert_to_path(&mut source, "small.mzXML", metadata, &config)?;
//! println!("{}", stats.digest.unwrap_or_default());
//! # Ok(())
//! # }
//! ```
pub mod bindata;
pub mod io;
pub mod meta;
pub mod params;
pub mod scan;
pub mod signal;

pub use crate::io::{
    convert, ConversionConfig, ConversionError, DocumentFormat, DocumentMetadata, MzMLWriter,
    MzXMLWriter, ScanSource, ScanWriter,
};
pub use crate::scan::{Precursor, Scan};
