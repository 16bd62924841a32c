use std::{
    fs,
    io::{self, prelude::*, SeekFrom},
    path::Path,
    str,
};

use log::{debug, warn};
use thiserror::Error;

use super::super::{
    offset_index::OffsetIndex,
    traits::{ScanSource, ScanSourceError},
};

use crate::meta::{InstrumentInfo, RunInfo};
use crate::scan::{ActivationMethod, Polarity, Precursor, Scan, ScanType};

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum MGFParserState {
    Start,
    FileHeader,
    ScanHeaders,
    Peaks,
    Between,
    Done,
    Error,
}

#[derive(Debug, Error)]
pub enum MGFError {
    #[error("Encountered a malformed peak line: {0}")]
    MalformedPeakLine(String),
    #[error("Encountered a malformed header line: {0}")]
    MalformedHeaderLine(String),
    #[error("Not enough columns for peak line encountered")]
    NotEnoughColumnsForPeakLine,
    #[error("Peaks were found outside of a BEGIN IONS block")]
    UnexpectedLine,
}

/// Values an MGF file cannot express, applied to every scan it produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MGFScanDefaults {
    pub ms_level: u8,
    pub polarity: Polarity,
    pub scan_type: ScanType,
    pub activation: ActivationMethod,
}

impl Default for MGFScanDefaults {
    fn default() -> Self {
        Self {
            ms_level: 2,
            polarity: Polarity::Positive,
            scan_type: ScanType::Full,
            activation: ActivationMethod::CollisionInducedDissociation,
        }
    }
}

#[derive(Debug, Default)]
struct ScanBuilder {
    scan_number: Option<u64>,
    title: Option<String>,
    retention_time: Option<f64>,
    mz_array: Vec<f64>,
    intensity_array: Vec<f64>,
    precursor: Option<Precursor>,
    precursor_charge: Option<i32>,
    empty_metadata: bool,
}

impl ScanBuilder {
    fn new() -> Self {
        Self {
            empty_metadata: true,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.empty_metadata && self.mz_array.is_empty()
    }

    fn into_scan(self, scan_number: u64, defaults: &MGFScanDefaults) -> Result<Scan, MGFError> {
        let mut scan = Scan::new(scan_number, defaults.ms_level)
            .with_peaks(self.mz_array, self.intensity_array)
            .map_err(|e| MGFError::MalformedPeakLine(e.to_string()))?;
        scan.polarity = match self.precursor_charge {
            Some(z) if z < 0 => Polarity::Negative,
            _ => defaults.polarity,
        };
        scan.scan_type = defaults.scan_type;
        scan.is_centroided = true;
        if let Some(rt) = self.retention_time {
            scan.retention_time = rt;
        }
        if scan.ms_level > 1 {
            scan.activation = defaults.activation;
            let mut precursor = self.precursor.unwrap_or_default();
            if precursor.charge.is_none() {
                precursor.charge = self
                    .precursor_charge
                    .map(|z| z.unsigned_abs())
                    .filter(|z| *z > 0);
            }
            scan.precursor = Some(precursor);
        }
        scan.update_summaries();
        if !scan.is_empty() {
            scan.start_mz = scan.min_observed_mz;
            scan.end_mz = scan.max_observed_mz;
        }
        if let Some(title) = self.title {
            debug!("Read scan {scan_number} titled {title}");
        }
        Ok(scan)
    }
}

/**
A [`ScanSource`] over an MGF (Mascot Generic Format) peak list file.

MGF records carry no instrument description, so the caller supplies one with
[`MGFScanSource::with_instrument_info`]. Every record becomes a centroided scan with the
[`MGFScanDefaults`] applied. Scan numbers come from a record's `SCANS` header when present
and otherwise count up from one past the previous scan.

Construction makes a quick pass over the whole stream to count the records and learn
the retention time range, then rewinds.
*/
pub struct MGFScanSource<R: Read + Seek> {
    pub handle: io::BufReader<R>,
    pub state: MGFParserState,
    pub defaults: MGFScanDefaults,
    line_number: usize,
    last_scan_number: u64,
    index: OffsetIndex,
    time_range: Option<(f64, f64)>,
    instrument_info: InstrumentInfo,
}

impl<R: Read + Seek> MGFScanSource<R> {
    pub fn new(file: R) -> io::Result<Self> {
        let mut source = Self {
            handle: io::BufReader::new(file),
            state: MGFParserState::Start,
            defaults: MGFScanDefaults::default(),
            line_number: 0,
            last_scan_number: 0,
            index: OffsetIndex::new("scan"),
            time_range: None,
            instrument_info: InstrumentInfo::default(),
        };
        source.build_index()?;
        Ok(source)
    }

    pub fn with_instrument_info(mut self, instrument_info: InstrumentInfo) -> Self {
        self.instrument_info = instrument_info;
        self
    }

    pub fn with_defaults(mut self, defaults: MGFScanDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The byte offset of each `BEGIN IONS` line, keyed by record ordinal starting at 1
    pub fn get_index(&self) -> &OffsetIndex {
        &self.index
    }

    /// A run description spanning the retention times seen in the file
    pub fn run_info(&self) -> RunInfo {
        match self.time_range {
            Some((start, end)) => RunInfo::new(start, end),
            None => RunInfo::default(),
        }
    }

    /// Builds an offset index to each `BEGIN IONS` line
    /// by doing a fast pre-scan of the text file.
    fn build_index(&mut self) -> io::Result<u64> {
        let mut offset: u64 = 0;
        let mut time_range: Option<(f64, f64)> = None;
        let start = self.handle.stream_position()?;
        self.handle.seek(SeekFrom::Start(0))?;

        let mut buffer: Vec<u8> = Vec::new();
        loop {
            buffer.clear();
            let b = self.handle.read_until(b'\n', &mut buffer)?;
            if b == 0 {
                break;
            }
            if buffer.starts_with(b"BEGIN IONS") {
                let ordinal = self.index.len() as u64 + 1;
                self.index.insert(ordinal, offset);
            } else if let Some(rest) = buffer.strip_prefix(b"RTINSECONDS=") {
                let rt = str::from_utf8(rest)
                    .ok()
                    .and_then(|s| s.trim().parse::<f64>().ok());
                if let Some(rt) = rt {
                    time_range = Some(match time_range {
                        Some((lo, hi)) => (lo.min(rt), hi.max(rt)),
                        None => (rt, rt),
                    });
                }
            }
            offset += b as u64;
        }
        self.handle.seek(SeekFrom::Start(start))?;
        self.time_range = time_range;
        if self.index.is_empty() {
            warn!("An index was built but no entries were found")
        }
        Ok(offset)
    }

    fn parse_peak_from_line(
        &mut self,
        line: &str,
        builder: &mut ScanBuilder,
    ) -> Result<bool, MGFError> {
        let first = match line.chars().next() {
            Some(c) => c,
            None => return Ok(false),
        };
        if !first.is_numeric() {
            return Ok(false);
        }
        let mut it = line.split_ascii_whitespace();
        let (mz_token, intensity_token) = match (it.next(), it.next()) {
            (Some(mz), Some(intensity)) => (mz, intensity),
            _ => return Err(MGFError::NotEnoughColumnsForPeakLine),
        };
        let mz: f64 = mz_token
            .parse()
            .map_err(|e| MGFError::MalformedPeakLine(format!("{line}: {e}")))?;
        let intensity: f64 = intensity_token
            .parse()
            .map_err(|e| MGFError::MalformedPeakLine(format!("{line}: {e}")))?;
        builder.mz_array.push(mz);
        builder.intensity_array.push(intensity);
        Ok(true)
    }

    fn parse_charge(&self, value: &str) -> Result<i32, MGFError> {
        // Multiple candidate charges, e.g. "2+ and 3+", keep the first
        let value = value.split_ascii_whitespace().next().unwrap_or_default();
        let (sign, value, tail_sign) = if let Some(stripped) = value.strip_suffix('+') {
            (1, stripped, true)
        } else if let Some(stripped) = value.strip_suffix('-') {
            (-1, stripped, true)
        } else {
            (1, value, false)
        };

        if tail_sign && (value.starts_with('-') || value.starts_with('+')) {
            return Err(MGFError::MalformedHeaderLine(format!(
                "Could not parse charge value {value}"
            )));
        }

        value.parse::<i32>().map(|z| sign * z).map_err(|e| {
            MGFError::MalformedHeaderLine(format!("Could not parse charge value {value} : {e}"))
        })
    }

    fn handle_scan_header(&mut self, line: &str, builder: &mut ScanBuilder) -> Result<(), MGFError> {
        if self.parse_peak_from_line(line, builder)? {
            self.state = MGFParserState::Peaks;
            return Ok(());
        }
        if line == "END IONS" {
            self.state = MGFParserState::Between;
            return Ok(());
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| MGFError::MalformedHeaderLine("No '=' in header line".into()))?;
        let value = value.trim();
        builder.empty_metadata = false;
        match key {
            "TITLE" => builder.title = Some(value.to_string()),
            "SCANS" => {
                // A range such as "120-124" names the first scan
                let first = value.split('-').next().unwrap_or_default();
                builder.scan_number = Some(first.trim().parse().map_err(|e| {
                    MGFError::MalformedHeaderLine(format!("Malformed SCANS value {value}: {e}"))
                })?);
            }
            "RTINSECONDS" => {
                builder.retention_time = Some(value.parse::<f64>().map_err(|e| {
                    MGFError::MalformedHeaderLine(format!(
                        "Malformed RTINSECONDS value {value}: {e}"
                    ))
                })?);
            }
            "PEPMASS" => {
                let mut parts = value.split_ascii_whitespace();
                let mz = parts.next().ok_or_else(|| {
                    MGFError::MalformedHeaderLine("No m/z value in PEPMASS header".into())
                })?;
                let mz: f64 = mz.parse().map_err(|e| {
                    MGFError::MalformedHeaderLine(format!(
                        "Malformed m/z value in PEPMASS header {value}: {e}"
                    ))
                })?;
                let intensity: f64 = parts
                    .next()
                    .map(|v| v.parse())
                    .unwrap_or_else(|| Ok(0.0))
                    .map_err(|e| warn!("Failed to parse PEPMASS intensity {value}: {e}"))
                    .unwrap_or_default();
                let charge = match parts.next() {
                    Some(c) => Some(self.parse_charge(c)?),
                    None => builder.precursor_charge,
                };
                builder.precursor = Some(Precursor {
                    mz,
                    mz_is_accurate: true,
                    intensity,
                    charge: charge.map(|z| z.unsigned_abs()).filter(|z| *z > 0),
                    ..Default::default()
                });
                if builder.precursor_charge.is_none() {
                    builder.precursor_charge = charge;
                }
            }
            "CHARGE" => {
                let charge = self.parse_charge(value)?;
                builder.precursor_charge = Some(charge);
                if let Some(precursor) = builder.precursor.as_mut() {
                    if precursor.charge.is_none() && charge != 0 {
                        precursor.charge = Some(charge.unsigned_abs());
                    }
                }
            }
            _ => {
                debug!("Ignoring MGF header {key}");
            }
        };
        Ok(())
    }

    fn handle_peak(&mut self, line: &str, builder: &mut ScanBuilder) -> Result<bool, MGFError> {
        if self.parse_peak_from_line(line, builder)? {
            Ok(true)
        } else if line == "END IONS" {
            self.state = MGFParserState::Between;
            Ok(false)
        } else {
            Err(MGFError::MalformedPeakLine(line.to_string()))
        }
    }

    fn handle_start(&mut self, line: &str) -> Result<(), MGFError> {
        if line == "BEGIN IONS" {
            self.state = MGFParserState::ScanHeaders;
            Ok(())
        } else if line.contains('=') {
            self.state = MGFParserState::FileHeader;
            Ok(())
        } else if line.starts_with('#') {
            Ok(())
        } else {
            Err(MGFError::UnexpectedLine)
        }
    }

    /// Read lines until one record is complete or the stream ends, returning whether
    /// a record was started
    fn parse_into(&mut self, builder: &mut ScanBuilder) -> Result<bool, ScanSourceError> {
        let mut buffer = String::new();
        let mut had_begin_ions = false;

        loop {
            buffer.clear();
            let b = self.handle.read_line(&mut buffer).inspect_err(|_| {
                self.state = MGFParserState::Error;
            })?;
            if b == 0 {
                self.state = MGFParserState::Done;
                break;
            }
            self.line_number += 1;

            let line = buffer.trim();
            if line.is_empty() {
                continue;
            }

            let result = match self.state {
                MGFParserState::Start | MGFParserState::FileHeader | MGFParserState::Between => {
                    self.handle_start(line).map(|_| {
                        had_begin_ions |= self.state == MGFParserState::ScanHeaders;
                        true
                    })
                }
                MGFParserState::ScanHeaders => {
                    self.handle_scan_header(line, builder)
                        .map(|_| self.state != MGFParserState::Between)
                }
                MGFParserState::Peaks => self.handle_peak(line, builder),
                MGFParserState::Done => Ok(false),
                MGFParserState::Error => Err(MGFError::UnexpectedLine),
            };

            match result {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    self.state = MGFParserState::Error;
                    return Err(ScanSourceError::MalformedRecord {
                        line: self.line_number,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(had_begin_ions)
    }

    /// Read the next scan from the file, if there is one.
    pub fn read_next(&mut self) -> Result<Option<Scan>, ScanSourceError> {
        if matches!(self.state, MGFParserState::Done) {
            return Ok(None);
        }
        let mut builder = ScanBuilder::new();
        let started = self.parse_into(&mut builder)?;
        if !started {
            return Ok(None);
        }
        let scan_number = builder
            .scan_number
            .unwrap_or(self.last_scan_number + 1);
        self.last_scan_number = scan_number;
        if builder.is_empty() {
            // Still counted by the index, so it is passed on as an empty scan
            warn!(
                "Record ending on line {} has no headers or peaks",
                self.line_number
            );
        }
        let scan = builder
            .into_scan(scan_number, &self.defaults)
            .map_err(|e| ScanSourceError::MalformedRecord {
                line: self.line_number,
                message: e.to_string(),
            })?;
        Ok(Some(scan))
    }
}

impl MGFScanSource<fs::File> {
    pub fn open_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(fs::File::open(path)?)
    }
}

impl<R: Read + Seek> ScanSource for MGFScanSource<R> {
    fn next_scan(&mut self) -> Result<Option<Scan>, ScanSourceError> {
        self.read_next()
    }

    fn total_count(&self) -> u64 {
        self.index.len() as u64
    }

    fn instrument_info(&self) -> &InstrumentInfo {
        &self.instrument_info
    }
}

pub fn is_mgf(buf: &[u8]) -> bool {
    let needle = b"BEGIN IONS";
    buf.windows(needle.len()).any(|window| window == needle)
}
