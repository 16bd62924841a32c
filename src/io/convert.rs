//! The conversion pipeline: pull scans from a [`ScanSource`], condition their signal,
//! and stream them into one indexed document.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::bindata::PeakEncodingError;
use crate::scan::Scan;
use crate::signal::{centroid_in_range, CentroidSettings, SignalError, ThresholdSettings};

use super::document::{DocumentMetadata, WriterError};
use super::mzml::MzMLWriterType;
use super::mzxml::MzXMLWriterType;
use super::sink::CountingSink;
use super::traits::{ScanSource, ScanSourceError, ScanWriter};
use super::xml_writer::XMLWriterError;

/// The document format to emit. Exactly one is chosen per conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DocumentFormat {
    MzML,
    #[default]
    MzXML,
}

impl DocumentFormat {
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::MzML => "mzML",
            Self::MzXML => "mzXML",
        }
    }
}

/// Controls how scans are conditioned and which document is written
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionConfig {
    pub format: DocumentFormat,
    /// Centroid profile scans before writing them
    pub centroid: bool,
    /// Deflate peak payloads when that makes them smaller
    pub compress_peaks: bool,
    /// Gzip the whole output document
    pub gzip: bool,
    pub threshold: Option<ThresholdSettings>,
    /// Use the less precise precursor m/z parsed from the filter line
    pub force_precursor_from_filter_line: bool,
    /// The data has no discrete precursors, as in MSe acquisitions
    pub shotgun_fragmentation: bool,
    pub centroid_settings: CentroidSettings,
}

impl ConversionConfig {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_centroiding(mut self, centroid: bool) -> Self {
        self.centroid = centroid;
        self
    }

    pub fn with_peak_compression(mut self, compress_peaks: bool) -> Self {
        self.compress_peaks = compress_peaks;
        self
    }

    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdSettings) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// The output path for `input`: its extension replaced by the document format's,
    /// with `.gz` appended when gzipping
    pub fn output_path_for<P: AsRef<Path>>(&self, input: P) -> PathBuf {
        let mut path = input.as_ref().with_extension(self.format.extension());
        if self.gzip {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".gz");
            path.set_file_name(name);
        }
        path
    }
}

/// Tallies what happened to the scans during a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub scans_written: u64,
    pub empty_scans: u64,
    pub centroided: u64,
    pub thresholded: u64,
    pub warnings: u64,
    /// The document checksum written into the trailer
    pub digest: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to read a scan: {0}")]
    Source(
        #[from]
        #[source]
        ScanSourceError,
    ),
    #[error("Failed to write the document: {0}")]
    Writer(
        #[from]
        #[source]
        WriterError,
    ),
    #[error("Failed to condition scan {scan_number}: {source}")]
    Signal {
        scan_number: u64,
        #[source]
        source: SignalError,
    },
    #[error("An IO error occurred: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

impl From<PeakEncodingError> for ConversionError {
    fn from(value: PeakEncodingError) -> Self {
        Self::Writer(value.into())
    }
}

impl From<XMLWriterError> for ConversionError {
    fn from(value: XMLWriterError) -> Self {
        Self::Writer(value.into())
    }
}

/// Apply the configured precursor source, centroiding and thresholding to `scan`
pub fn condition_scan(
    scan: &mut Scan,
    config: &ConversionConfig,
    stats: &mut ConversionStats,
) -> Result<(), ConversionError> {
    let scan_number = scan.scan_number;
    let signal_err = move |source| ConversionError::Signal {
        scan_number,
        source,
    };

    if config.force_precursor_from_filter_line && scan.ms_level >= 2 {
        match scan.precursor.as_mut() {
            Some(precursor) => match precursor.filter_line_mz {
                Some(mz) => {
                    precursor.mz = mz;
                    precursor.mz_is_accurate = false;
                }
                None => {
                    warn!(
                        "Scan {} has no filter line precursor m/z, keeping {}",
                        scan.scan_number, precursor.mz
                    );
                    stats.warnings += 1;
                }
            },
            None => {
                warn!("Scan {} has no precursor", scan.scan_number);
                stats.warnings += 1;
            }
        }
    }

    if config.centroid && !scan.is_centroided {
        let class = config.centroid_settings.instrument_class_for(scan);
        let range = config.centroid_settings.valid_mz_range;
        centroid_in_range(scan, class, range).map_err(signal_err)?;
        scan.update_summaries();
        stats.centroided += 1;
    }

    if let Some(threshold) = config.threshold {
        threshold.apply(scan).map_err(signal_err)?;
        stats.thresholded += 1;
    }

    if scan.is_empty() {
        warn!("Scan {} has no peaks", scan.scan_number);
        stats.empty_scans += 1;
    }
    Ok(())
}

fn write_scans<S: ScanSource, T: ScanWriter>(
    source: &mut S,
    writer: &mut T,
    config: &ConversionConfig,
    stats: &mut ConversionStats,
) -> Result<(), ConversionError> {
    while let Some(mut scan) = source.next_scan()? {
        condition_scan(&mut scan, config, stats)?;
        writer.write_scan(&scan)?;
        stats.scans_written += 1;
        if stats.scans_written % 1000 == 0 {
            debug!("Wrote {} scans", stats.scans_written);
        }
    }
    writer.close()?;
    Ok(())
}

/**
Convert every scan `source` produces into one document written to `sink`, returning
the underlying writer and what happened along the way.

The instrument description is taken from `source` and the `centroided` flag from
`config`, overriding whatever `metadata` held.
*/
pub fn convert<S: ScanSource, W: Write>(
    source: &mut S,
    sink: CountingSink<W>,
    mut metadata: DocumentMetadata,
    config: &ConversionConfig,
) -> Result<(W, ConversionStats), ConversionError> {
    let mut stats = ConversionStats::default();
    let total = source.total_count();
    metadata.instrument = source.instrument_info().clone();
    metadata.centroided = config.centroid;
    info!(
        "Converting {total} scans to {}",
        config.format.extension()
    );

    let inner = match config.format {
        DocumentFormat::MzML => {
            let mut writer = MzMLWriterType::new(sink, metadata, total)
                .with_compression(config.compress_peaks);
            write_scans(source, &mut writer, config, &mut stats)?;
            stats.digest = writer.digest().map(String::from);
            writer.into_inner()?
        }
        DocumentFormat::MzXML => {
            let mut writer = MzXMLWriterType::new(sink, metadata, total)
                .with_compression(config.compress_peaks)
                .with_shotgun_fragmentation(config.shotgun_fragmentation);
            write_scans(source, &mut writer, config, &mut stats)?;
            stats.digest = writer.digest().map(String::from);
            writer.into_inner()?
        }
    };
    if stats.empty_scans > 0 {
        warn!("{} of {} scans were empty", stats.empty_scans, stats.scans_written);
    }
    Ok((inner, stats))
}

/// Convert `source` into a new file at `path`, gzipped if `config.gzip` is set
pub fn convert_to_path<S: ScanSource, P: AsRef<Path>>(
    source: &mut S,
    path: P,
    metadata: DocumentMetadata,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConversionError> {
    let path = path.as_ref();
    let file = fs::File::create(path)?;
    let sink = if config.gzip {
        CountingSink::new_gzipped(file)
    } else {
        CountingSink::new(file)
    };
    let (mut file, stats) = convert(source, sink, metadata, config)?;
    file.flush()?;
    info!("Wrote {} scans to {}", stats.scans_written, path.display());
    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::compression::decompress_if_gzipped;
    use crate::io::traits::MemoryScanSource;
    use crate::io::utils::checksum_file;
    use crate::meta::{InstrumentInfo, Manufacturer, RunInfo, SourceFile};
    use crate::scan::{
        ActivationMethod, Ionization, MassAnalyzer, Polarity, Precursor, ScanType,
    };
    use crate::signal::InstrumentClass;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;

    fn instrument() -> InstrumentInfo {
        InstrumentInfo::new(
            Manufacturer::ThermoFinnigan,
            "LTQ",
            Ionization::Electrospray,
            vec![MassAnalyzer::IonTrap],
        )
    }

    fn metadata() -> DocumentMetadata {
        DocumentMetadata::new(InstrumentInfo::default())
            .with_source_file(SourceFile::new(
                "run01.RAW",
                "file:///data",
                "da39a3ee5e6b4b0d3255bfef95601890afd80709",
            ))
            .with_run(RunInfo::new(1.0, 3.0))
    }

    /// A profile with two broad Gaussian peaks sampled every 0.05 m/z
    fn profile_scan(scan_number: u64, ms_level: u8) -> Scan {
        let mz: Vec<f64> = (0..400).map(|i| 400.0 + i as f64 * 0.05).collect();
        let intensity: Vec<f64> = mz
            .iter()
            .map(|x| {
                let a = 1e4 * (-(x - 405.0).powi(2) / 2.0).exp();
                let b = 3e3 * (-(x - 412.5).powi(2) / 2.0).exp();
                a + b
            })
            .collect();
        let mut scan = Scan::new(scan_number, ms_level).with_peaks(mz, intensity).unwrap();
        scan.polarity = Polarity::Positive;
        scan.analyzer = MassAnalyzer::IonTrap;
        scan.start_mz = 400.0;
        scan.end_mz = 420.0;
        scan.retention_time = scan_number as f64;
        scan.injection_time = 10.0;
        if ms_level == 1 {
            scan.scan_type = ScanType::Full;
        } else {
            scan.scan_type = ScanType::ProductIonScan;
            scan.activation = ActivationMethod::CollisionInducedDissociation;
            scan.precursor = Some(Precursor {
                scan_number: Some(scan_number - 1),
                mz: 405.0,
                filter_line_mz: Some(405.01),
                charge: Some(2),
                intensity: 1e4,
                collision_energy: 35.0,
                ..Default::default()
            });
        }
        scan.update_summaries();
        scan
    }

    fn scans() -> Vec<Scan> {
        vec![profile_scan(1, 1), profile_scan(2, 2), profile_scan(3, 1)]
    }

    fn run(scans: Vec<Scan>, config: &ConversionConfig) -> Result<(String, ConversionStats), ConversionError> {
        let mut source = MemoryScanSource::from((scans, instrument()));
        let (buf, stats) = convert(&mut source, CountingSink::new(Vec::new()), metadata(), config)?;
        Ok((String::from_utf8(buf).unwrap(), stats))
    }

    fn index_offsets(text: &str) -> Vec<u64> {
        let mut reader = Reader::from_str(text);
        let mut in_offset = false;
        let mut offsets = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"offset" => in_offset = true,
                Event::Text(t) if in_offset => {
                    offsets.push(t.unescape().unwrap().parse().unwrap());
                    in_offset = false;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        offsets
    }

    #[test_log::test]
    fn test_end_to_end() -> Result<(), ConversionError> {
        for format in [DocumentFormat::MzML, DocumentFormat::MzXML] {
            let config = ConversionConfig::new(format).with_peak_compression(true);
            let (text, stats) = run(scans(), &config)?;
            assert_eq!(stats.scans_written, 3);
            assert_eq!(stats.empty_scans, 0);

            let offsets = index_offsets(&text);
            assert_eq!(offsets.len(), 3);
            for offset in offsets {
                assert_eq!(text.as_bytes()[offset as usize], b'<');
            }
            let digest = stats.digest.clone().unwrap();
            assert_eq!(digest.len(), 40);

            match format {
                DocumentFormat::MzML => {
                    assert!(text.contains("<precursor spectrumRef=\"S1\" >"));
                    assert!(text.contains("accession=\"MS:1000574\""));
                }
                DocumentFormat::MzXML => {
                    let ms2 = text.find("<scan num=\"2\"").unwrap();
                    let close_first = text.find("</scan>").unwrap();
                    assert!(ms2 < close_first);
                    assert!(text.contains("<precursorMz precursorScanNum=\"1\" "));
                    assert!(text.contains("compressionType=\"zlib\""));
                }
            }

            let mut perturbed = scans();
            let (mz, mut intensity) = perturbed[1].take_peaks();
            let bits = (intensity[200] as f32).to_bits();
            intensity[200] = f32::from_bits(bits + 1) as f64;
            perturbed[1].set_peaks(mz, intensity).unwrap();
            let (_, stats2) = run(perturbed, &config)?;
            assert_ne!(stats2.digest.unwrap(), digest);
        }
        Ok(())
    }

    #[test_log::test]
    fn test_centroid_and_threshold() -> Result<(), ConversionError> {
        let mut config = ConversionConfig::new(DocumentFormat::MzXML)
            .with_centroiding(true)
            .with_threshold(ThresholdSettings::new(5000.0, true));
        config.centroid_settings.instrument_class = Some(InstrumentClass::Other);
        let (text, stats) = run(scans(), &config)?;
        assert_eq!(stats.centroided, 3);
        assert_eq!(stats.thresholded, 3);
        assert!(text.contains("centroided=\"1\""));
        assert!(text.contains("peaksCount=\"1\""));
        Ok(())
    }

    #[test_log::test]
    fn test_condition_scan() -> Result<(), ConversionError> {
        let mut stats = ConversionStats::default();
        let mut config = ConversionConfig::default();
        config.force_precursor_from_filter_line = true;

        let mut scan = profile_scan(2, 2);
        condition_scan(&mut scan, &config, &mut stats)?;
        let precursor = scan.precursor.as_ref().unwrap();
        assert_eq!(precursor.mz, 405.01);
        assert!(!precursor.mz_is_accurate);

        scan.precursor.as_mut().unwrap().filter_line_mz = None;
        condition_scan(&mut scan, &config, &mut stats)?;
        assert_eq!(stats.warnings, 1);

        let mut empty = Scan::new(4, 1);
        condition_scan(&mut empty, &config, &mut stats)?;
        assert_eq!(stats.empty_scans, 1);

        let mut unsorted = Scan::new(5, 1)
            .with_peaks(vec![2.0, 1.0], vec![1.0, 1.0])
            .unwrap();
        config.threshold = Some(ThresholdSettings::new(1.0, false));
        assert!(matches!(
            condition_scan(&mut unsorted, &config, &mut stats),
            Err(ConversionError::Signal { scan_number: 5, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_output_path() {
        let config = ConversionConfig::new(DocumentFormat::MzML);
        assert_eq!(
            config.output_path_for("/data/run01.mgf"),
            PathBuf::from("/data/run01.mzML")
        );
        let config = ConversionConfig::new(DocumentFormat::MzXML).with_gzip(true);
        assert_eq!(
            config.output_path_for("run01.raw"),
            PathBuf::from("run01.mzXML.gz")
        );
    }

    #[test_log::test]
    fn test_convert_to_gzipped_path() -> Result<(), ConversionError> {
        let dir = tempfile::tempdir()?;
        let config = ConversionConfig::new(DocumentFormat::MzXML)
            .with_gzip(true)
            .with_peak_compression(true);
        let path = config.output_path_for(dir.path().join("run01.raw"));
        let mut source = MemoryScanSource::from((scans(), instrument()));
        let stats = convert_to_path(&mut source, &path, metadata(), &config)?;
        assert_eq!(stats.scans_written, 3);

        let mut text = String::new();
        decompress_if_gzipped(fs::File::open(&path)?)?.read_to_string(&mut text)?;
        assert!(text.ends_with("</mzXML>\n"));
        let offsets = index_offsets(&text);
        assert_eq!(offsets.len(), 3);
        for offset in offsets {
            assert!(text[offset as usize..].starts_with("<scan"));
        }
        // The checksum of the decompressed file is over the same logical bytes
        assert_eq!(checksum_file(&path)?.len(), 40);
        Ok(())
    }
}
