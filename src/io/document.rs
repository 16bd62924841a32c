//! State and validation shared by the indexed document writers.
use std::fmt::Display;
use std::io;

use log::warn;
use thiserror::Error;

use crate::bindata::PeakEncodingError;
use crate::meta::{InstrumentInfo, RunInfo, Software, SourceFile};
use crate::scan::Scan;

use super::xml_writer::XMLWriterError;
use super::OffsetIndex;

/**
The different states a document writer can enter while writing an indexed
document. This is only necessary for the module consumer when determining
where something may have gone wrong.
*/
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord)]
pub enum DocumentState {
    Start,
    DocumentOpen,
    Header,
    ScanList,
    ScanListClosed,
    IndexList,
    End,
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("{field} is undefined{}", .scan_number.map(|n| format!(" for scan {n}")).unwrap_or_default())]
    UndefinedField {
        field: &'static str,
        scan_number: Option<u64>,
    },
    #[error("The instrument manufacturer is undefined, no source file format can be declared")]
    UnsupportedManufacturer,
    #[error("Exactly one mass analyzer must be listed, found {0}")]
    UnsupportedAnalyzerCount(usize),
    #[error("Scan {current} cannot follow scan {previous}, scan numbers must ascend")]
    ScanOrder { previous: u64, current: u64 },
    #[error("The document declared {declared} scans but {written} were written")]
    ScanCountMismatch { declared: u64, written: u64 },
    #[error("Cannot transition from {from_state:?} to {to_state:?}")]
    StateTransitionError {
        from_state: DocumentState,
        to_state: DocumentState,
    },
    #[error("Failed to encode peaks: {0}")]
    Encoding(
        #[from]
        #[source]
        PeakEncodingError,
    ),
    #[error(transparent)]
    XML(#[from] XMLWriterError),
    #[error("An IO error occurred: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

pub type WriterResult<T> = Result<T, WriterError>;

/// Everything a document says about a run besides its scans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub instrument: InstrumentInfo,
    pub source_files: Vec<SourceFile>,
    pub run: RunInfo,
    /// The converting program
    pub software: Software,
    /// Whether the writer's caller centroided the profile scans
    pub centroided: bool,
}

impl DocumentMetadata {
    pub fn new(instrument: InstrumentInfo) -> Self {
        Self {
            instrument,
            ..Default::default()
        }
    }

    pub fn with_source_file(mut self, source_file: SourceFile) -> Self {
        self.source_files.push(source_file);
        self
    }

    pub fn with_run(mut self, run: RunInfo) -> Self {
        self.run = run;
        self
    }

    /// Check the instrument description can be written. `single_analyzer` demands
    /// exactly one analyzer, otherwise at least one is enough.
    pub fn validate(&self, single_analyzer: bool) -> WriterResult<()> {
        let info = &self.instrument;
        if !info.manufacturer.is_defined() {
            return Err(WriterError::UnsupportedManufacturer);
        }
        if !info.ionization.is_defined() {
            return Err(WriterError::UndefinedField {
                field: "ionization",
                scan_number: None,
            });
        }
        let n_analyzers = info.analyzers.len();
        if n_analyzers == 0 || (single_analyzer && n_analyzers != 1) {
            return Err(WriterError::UnsupportedAnalyzerCount(n_analyzers));
        }
        if let Some(i) = info.analyzers.iter().position(|a| !a.is_defined()) {
            warn!("Analyzer {i} of the instrument is undefined");
            return Err(WriterError::UndefinedField {
                field: "analyzer",
                scan_number: None,
            });
        }
        Ok(())
    }
}

/// Refuse to write a scan whose tags are unresolved
pub(crate) fn validate_scan(scan: &Scan, require_activation: bool) -> WriterResult<()> {
    let undefined = |field| WriterError::UndefinedField {
        field,
        scan_number: Some(scan.scan_number),
    };
    if !scan.polarity.is_defined() {
        return Err(undefined("polarity"));
    }
    if !scan.scan_type.is_defined() {
        return Err(undefined("scan type"));
    }
    if require_activation && scan.ms_level >= 2 && !scan.activation.is_defined() {
        return Err(undefined("activation method"));
    }
    Ok(())
}

/// Tracks the scans a writer has emitted and where they start
#[derive(Debug, Clone)]
pub(crate) struct ScanLedger {
    pub declared: u64,
    pub offset_index: OffsetIndex,
    last_scan_number: Option<u64>,
}

impl ScanLedger {
    pub fn new(index_name: &str, declared: u64) -> Self {
        Self {
            declared,
            offset_index: OffsetIndex::new(index_name),
            last_scan_number: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.offset_index.len() as u64
    }

    pub fn check_order(&self, scan_number: u64) -> WriterResult<()> {
        match self.last_scan_number {
            Some(previous) if scan_number <= previous => Err(WriterError::ScanOrder {
                previous,
                current: scan_number,
            }),
            _ => Ok(()),
        }
    }

    pub fn record(&mut self, scan_number: u64, offset: u64) {
        self.last_scan_number = Some(scan_number);
        self.offset_index.insert(scan_number, offset);
    }

    pub fn check_count(&self) -> WriterResult<()> {
        let written = self.written();
        if written != self.declared {
            Err(WriterError::ScanCountMismatch {
                declared: self.declared,
                written,
            })
        } else {
            Ok(())
        }
    }
}

/// Format a duration in seconds as an `xs:duration`, e.g. `PT12.5S`
pub fn format_duration<T: Display>(seconds: T) -> String {
    format!("PT{seconds}S")
}

/// Format a duration in seconds as an `xs:duration` with a fixed number of decimal places
pub fn format_duration_precision(seconds: f64, precision: usize) -> String {
    format!("PT{seconds:.precision$}S")
}
