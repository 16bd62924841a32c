use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::bindata::PeakArrayEncoder;
use crate::scan::{MergeState, Precursor, Scan};

use super::super::document::{
    format_duration, format_duration_precision, validate_scan, DocumentMetadata, DocumentState,
    ScanLedger, WriterError, WriterResult,
};
use super::super::offset_index::OffsetIndex;
use super::super::sink::CountingSink;
use super::super::traits::ScanWriter;
use super::super::xml_writer::XMLElementWriter;
use super::nesting::ScanNesting;

const MZXML_NAMESPACE: &str = "http://sashimi.sourceforge.net/schema_revision/mzXML_3.1";
const MZXML_SCHEMA_LOCATION: &str = "http://sashimi.sourceforge.net/schema_revision/mzXML_3.1 http://sashimi.sourceforge.net/schema_revision/mzXML_3.1/mzXML_idx_3.1.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/**
An indexed mzXML 3.1 writer.

Scans are written out immediately and not retained. A scan with a higher MS level
than the scan before it is nested inside that scan's element, so product ion scans
sit inside their precursor scans. After the last scan, [`MzXMLWriterType::close`]
writes the scan offset index, the index's own offset and a SHA-1 digest of the
document up to and including the `<sha1>` start tag.
*/
#[derive(Debug)]
pub struct MzXMLWriterType<W: Write> {
    /// The run-level description written in the document header
    pub metadata: DocumentMetadata,
    /// MSe-style data without discrete precursors, omits `precursorMz`
    pub shotgun_fragmentation: bool,
    pub state: DocumentState,
    handle: XMLElementWriter<W>,
    ledger: ScanLedger,
    nesting: ScanNesting,
    encoder: PeakArrayEncoder,
    digest: Option<String>,
}

impl<W: Write> ScanWriter for MzXMLWriterType<W> {
    fn write_scan(&mut self, scan: &Scan) -> WriterResult<()> {
        MzXMLWriterType::write_scan(self, scan)
    }

    fn close(&mut self) -> WriterResult<()> {
        MzXMLWriterType::close(self)
    }

    fn scans_written(&self) -> u64 {
        self.ledger.written()
    }
}

impl<W: Write> MzXMLWriterType<W> {
    /// Prepare to write `scan_count` scans into `sink`. Nothing is written until
    /// the first scan arrives or the writer is closed.
    pub fn new(sink: CountingSink<W>, metadata: DocumentMetadata, scan_count: u64) -> Self {
        Self {
            metadata,
            shotgun_fragmentation: false,
            state: DocumentState::Start,
            handle: XMLElementWriter::new(sink),
            ledger: ScanLedger::new("scan", scan_count),
            nesting: ScanNesting::new(),
            encoder: PeakArrayEncoder::new(false),
            digest: None,
        }
    }

    /// Deflate peak payloads when doing so makes them smaller
    pub fn with_compression(mut self, compress_peaks: bool) -> Self {
        self.encoder = PeakArrayEncoder::new(compress_peaks);
        self
    }

    pub fn with_shotgun_fragmentation(mut self, shotgun_fragmentation: bool) -> Self {
        self.shotgun_fragmentation = shotgun_fragmentation;
        self
    }

    /// The offsets of the scans written so far
    pub fn offset_index(&self) -> &OffsetIndex {
        &self.ledger.offset_index
    }

    /// The document digest, available once the writer is closed
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    fn transition_err<T>(&self, to_state: DocumentState) -> WriterResult<T> {
        Err(WriterError::StateTransitionError {
            from_state: self.state,
            to_state,
        })
    }

    fn start_document(&mut self) -> WriterResult<()> {
        if self.state != DocumentState::Start {
            return self.transition_err(DocumentState::DocumentOpen);
        }
        self.metadata.validate(false)?;
        info!(
            "Writing mzXML document with {} scans",
            self.ledger.declared
        );
        self.handle.write_declaration()?;
        self.handle.open("mzXML")?;
        self.handle.attr("xmlns", MZXML_NAMESPACE)?;
        self.handle.attr("xmlns:xsi", XSI_NAMESPACE)?;
        self.handle
            .attr("xsi:schemaLocation", MZXML_SCHEMA_LOCATION)?;
        self.state = DocumentState::DocumentOpen;
        Ok(())
    }

    fn write_header(&mut self) -> WriterResult<()> {
        if self.state < DocumentState::DocumentOpen {
            self.start_document()?;
        } else {
            return self.transition_err(DocumentState::Header);
        }
        self.handle.condense_attributes = true;
        self.handle.open("msRun")?;
        self.handle.attr("scanCount", self.ledger.declared)?;
        self.handle
            .attr("startTime", format_duration(self.metadata.run.start_time))?;
        self.handle
            .attr("endTime", format_duration(self.metadata.run.end_time))?;

        self.write_parent_files()?;
        self.write_instrument()?;
        self.write_data_processing()?;
        self.state = DocumentState::Header;
        Ok(())
    }

    fn write_parent_files(&mut self) -> WriterResult<()> {
        if self.metadata.source_files.is_empty() {
            warn!("No source files were described, the mzXML document will have no parentFile");
        }
        for sf in self.metadata.source_files.iter() {
            self.handle.open("parentFile")?;
            self.handle.attr("fileName", sf.uri())?;
            self.handle.attr("fileType", "RAWData")?;
            self.handle.attr("fileSha1", &sf.sha1)?;
            self.handle.close()?;
        }
        Ok(())
    }

    fn write_category(&mut self, category: &str, value: &str) -> WriterResult<()> {
        self.handle.open(category)?;
        self.handle.attr("category", category)?;
        self.handle.attr("value", value)?;
        self.handle.close()?;
        Ok(())
    }

    fn write_instrument(&mut self) -> WriterResult<()> {
        let info = self.metadata.instrument.clone();
        self.handle.open("msInstrument")?;
        self.write_category("msManufacturer", info.manufacturer.name())?;
        self.write_category("msModel", &info.model)?;
        self.write_category("msIonisation", info.ionization.name())?;
        if let Some(analyzer) = info.single_analyzer() {
            self.write_category("msMassAnalyzer", analyzer.name())?;
        }
        self.write_category("msDetector", info.detector.name())?;

        self.handle.open("software")?;
        self.handle.attr("type", "acquisition")?;
        self.handle.attr("name", info.acquisition_software.name())?;
        self.handle
            .attr("version", &info.acquisition_software_version)?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_data_processing(&mut self) -> WriterResult<()> {
        self.handle.open("dataProcessing")?;
        if self.metadata.centroided {
            self.handle.attr("centroided", 1)?;
        }
        self.handle.open("software")?;
        self.handle.attr("type", "conversion")?;
        self.handle.attr("name", &self.metadata.software.name)?;
        self.handle
            .attr("version", &self.metadata.software.version)?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn start_scan_list(&mut self) -> WriterResult<()> {
        match self.state {
            DocumentState::ScanList => return Ok(()),
            state if state < DocumentState::Header => self.write_header()?,
            DocumentState::Header => {}
            _ => return self.transition_err(DocumentState::ScanList),
        }
        self.state = DocumentState::ScanList;
        Ok(())
    }

    /// Write out a single scan, nesting it inside the scans still open if its MS level
    /// is higher than theirs
    pub fn write_scan(&mut self, scan: &Scan) -> WriterResult<()> {
        self.start_scan_list()?;
        validate_scan(scan, !self.shotgun_fragmentation)?;
        self.ledger.check_order(scan.scan_number)?;
        let encoded = self.encoder.encode_scan(scan)?;
        if scan.is_empty() {
            debug!("Scan {} has no peaks", scan.scan_number);
        }

        for _ in 0..self.nesting.enter(scan.ms_level, scan.is_merge_result()) {
            self.handle.close()?;
        }

        self.handle.condense_attributes = true;
        let offset = self.handle.open("scan")?;
        self.handle.attr("num", scan.scan_number)?;
        self.handle.condense_attributes = false;
        self.handle.attr("msLevel", scan.ms_level)?;
        self.handle.attr("peaksCount", scan.len())?;
        self.handle.attr("polarity", scan.polarity.name())?;
        self.handle.attr("scanType", scan.scan_type.name())?;
        if self.metadata.instrument.manufacturer.is_thermo() {
            self.handle
                .attr("filterLine", scan.filter_line.as_deref().unwrap_or_default())?;
        }
        self.handle
            .attr("retentionTime", format_duration(scan.retention_time))?;
        self.handle.attr(
            "injectionTime",
            format_duration_precision(scan.injection_time, 4),
        )?;
        self.handle.attr("lowMz", scan.min_observed_mz)?;
        self.handle.attr("highMz", scan.max_observed_mz)?;
        self.handle.attr("basePeakMz", scan.base_peak_mz)?;
        self.handle
            .attr("basePeakIntensity", scan.base_peak_intensity)?;
        self.handle.attr("totIonCurrent", scan.total_ion_current)?;

        if let MergeState::Member { merged_scan_number } = scan.merge {
            self.handle.attr("merged", 1)?;
            if let Some(n) = merged_scan_number {
                self.handle.attr("mergedScanNum", n)?;
            }
        }

        if scan.ms_level >= 2 {
            let default_precursor = Precursor::default();
            let precursor = scan.precursor.as_ref().unwrap_or(&default_precursor);
            if precursor.collision_energy != 0.0 {
                self.handle
                    .attr("collisionEnergy", precursor.collision_energy)?;
            }
            if !self.shotgun_fragmentation {
                self.write_precursor(scan, precursor)?;
            }
        }

        if let Some(native) = scan.native_scan_ref.as_ref().filter(|n| !n.is_empty()) {
            self.handle.open("nativeScanRef")?;
            self.handle.attr("coordinateType", native.scheme.name())?;
            for coord in native.coordinates.iter() {
                self.handle.open("coordinate")?;
                self.handle.attr("name", coord.name.name())?;
                self.handle.attr("value", &coord.value)?;
                self.handle.close()?;
            }
            self.handle.close()?;
        }

        if scan.scan_origins.len() > 1 {
            for origin in scan.scan_origins.iter() {
                self.handle.open("scanOrigin")?;
                self.handle.attr("parentFileID", &origin.parent_file_id)?;
                self.handle.attr("num", origin.scan_number)?;
                self.handle.close()?;
            }
        }

        let pairs = &encoded.pairs;
        self.handle.condense_attributes = true;
        self.handle.open("peaks")?;
        self.handle.attr("precision", 32)?;
        self.handle.condense_attributes = false;
        self.handle.attr("byteOrder", "network")?;
        self.handle.attr("contentType", "m/z-int")?;
        if pairs.compressed {
            self.handle.attr("compressionType", "zlib")?;
            self.handle.attr("compressedLen", pairs.compressed_length)?;
        } else {
            self.handle.attr("compressionType", "none")?;
            self.handle.attr("compressedLen", 0)?;
        }
        self.handle.data(&pairs.text)?;
        self.handle.close()?;

        // The scan element stays open until a later scan or `close` decides its nesting
        self.ledger.record(scan.scan_number, offset);
        Ok(())
    }

    fn write_precursor(&mut self, scan: &Scan, precursor: &Precursor) -> WriterResult<()> {
        self.handle.condense_attributes = true;
        self.handle.open("precursorMz")?;
        self.handle
            .attr("precursorScanNum", precursor.scan_reference())?;
        self.handle
            .attr("precursorIntensity", precursor.intensity.max(0.0))?;
        if let Some(charge) = precursor.charge.filter(|z| *z > 0) {
            self.handle.attr("precursorCharge", charge)?;
        }
        if scan.activation.is_defined() {
            self.handle
                .attr("activationMethod", scan.activation.name())?;
        }
        self.handle.data(precursor.mz)?;
        self.handle.close()?;
        self.handle.condense_attributes = false;
        Ok(())
    }

    fn close_scan_list(&mut self) -> WriterResult<()> {
        self.start_scan_list()?;
        for _ in 0..self.nesting.drain() {
            self.handle.close()?;
        }
        // msRun
        self.handle.close()?;
        self.state = DocumentState::ScanListClosed;
        Ok(())
    }

    fn write_index(&mut self) -> WriterResult<()> {
        if self.state != DocumentState::ScanListClosed {
            return self.transition_err(DocumentState::IndexList);
        }
        self.state = DocumentState::IndexList;
        self.handle.condense_attributes = true;
        let index_offset = self.handle.open("index")?;
        self.handle.attr("name", &self.ledger.offset_index.name)?;
        let entries: Vec<(u64, u64)> = self.ledger.offset_index.iter().map(|(k, v)| (*k, *v)).collect();
        for (scan_number, offset) in entries {
            self.handle.open("offset")?;
            self.handle.attr("id", scan_number)?;
            self.handle.data(offset)?;
            self.handle.close()?;
        }
        self.handle.close()?;
        self.handle.element("indexOffset", index_offset)?;

        self.handle.open("sha1")?;
        self.handle.no_attr()?;
        self.handle.flush()?;
        let digest = self.handle.hexdigest();
        info!("mzXML document SHA-1: {digest}");
        self.handle.data(&digest)?;
        self.handle.close()?;
        self.digest = Some(digest);
        // mzXML
        self.handle.close()?;
        Ok(())
    }

    /**
    Close the open scans and the `msRun`, then write the index and checksum,
    completing the document.

    Fails with [`WriterError::ScanCountMismatch`] without writing the index if the
    number of scans written differs from the count declared in the header.
    */
    pub fn close(&mut self) -> WriterResult<()> {
        if self.state == DocumentState::End {
            return Ok(());
        }
        if self.state < DocumentState::ScanListClosed {
            self.close_scan_list()?;
        }
        self.ledger.check_count()?;
        self.write_index()?;
        self.handle.flush()?;
        self.state = DocumentState::End;
        Ok(())
    }

    /// Close the document if needed and return the underlying writer
    pub fn into_inner(mut self) -> WriterResult<W> {
        self.close()?;
        Ok(self.handle.finish()?)
    }
}

pub type MzXMLWriter = MzXMLWriterType<fs::File>;

impl MzXMLWriterType<fs::File> {
    /// Create a document at `path`, gzip-compressed when the path ends in `.gz`
    pub fn create_path<P: AsRef<Path>>(
        path: P,
        metadata: DocumentMetadata,
        scan_count: u64,
    ) -> io::Result<Self> {
        let sink = CountingSink::create_path(path)?;
        Ok(Self::new(sink, metadata, scan_count))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bindata::{unpack_network_floats, EMPTY_ARRAY_PLACEHOLDER};
    use crate::bindata::base64;
    use crate::io::utils::SHA1HashingStream;
    use crate::meta::{InstrumentInfo, Manufacturer, RunInfo, SourceFile};
    use crate::scan::{ActivationMethod, Ionization, MassAnalyzer, Polarity, ScanType};
    use quick_xml::events::Event;
    use quick_xml::Reader;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata::new(InstrumentInfo::new(
            Manufacturer::ThermoScientific,
            "LTQ Orbitrap",
            Ionization::Electrospray,
            vec![MassAnalyzer::FourierTransform],
        ))
        .with_source_file(SourceFile::new(
            "run.raw",
            "file:///data",
            "0123456789abcdef0123456789abcdef01234567",
        ))
        .with_run(RunInfo::new(1.0, 30.0))
    }

    fn make_scan(scan_number: u64, ms_level: u8) -> Scan {
        let mut scan = Scan::new(scan_number, ms_level)
            .with_peaks(vec![100.0, 200.5, 300.25], vec![10.0, 1000.0, 50.0])
            .unwrap();
        scan.polarity = Polarity::Positive;
        scan.scan_type = ScanType::Full;
        scan.retention_time = scan_number as f64;
        scan.injection_time = 0.5;
        scan.filter_line = Some(format!("FTMS + p ESI Full ms{ms_level}"));
        if ms_level > 1 {
            scan.activation = ActivationMethod::CollisionInducedDissociation;
            scan.precursor = Some(Precursor {
                scan_number: Some(1),
                mz: 200.5,
                charge: Some(2),
                intensity: 1000.0,
                collision_energy: 35.0,
                ..Default::default()
            });
        }
        scan.update_summaries();
        scan
    }

    fn write_document(levels: &[u8], compress: bool) -> WriterResult<String> {
        let mut writer = MzXMLWriterType::new(
            CountingSink::new(Vec::new()),
            metadata(),
            levels.len() as u64,
        )
        .with_compression(compress);
        for (i, level) in levels.iter().enumerate() {
            writer.write_scan(&make_scan(i as u64 + 1, *level))?;
        }
        let buf = writer.into_inner()?;
        Ok(String::from_utf8(buf).unwrap())
    }

    /// Read the nesting depth of every `scan` start tag and the index entries
    fn scan_structure(text: &str) -> (Vec<(u64, usize)>, Vec<(u64, u64)>) {
        let mut reader = Reader::from_str(text);
        let mut depth = 0usize;
        let mut scans = Vec::new();
        let mut index = Vec::new();
        let mut offset_id = None;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => {
                    if e.name().as_ref() == b"scan" {
                        let num = e.try_get_attribute("num").unwrap().unwrap();
                        let num: u64 = num.unescape_value().unwrap().parse().unwrap();
                        scans.push((num, depth));
                        depth += 1;
                    } else if e.name().as_ref() == b"offset" {
                        let id = e.try_get_attribute("id").unwrap().unwrap();
                        offset_id = Some(id.unescape_value().unwrap().parse::<u64>().unwrap());
                    }
                }
                Event::Empty(e) if e.name().as_ref() == b"scan" => {
                    let num = e.try_get_attribute("num").unwrap().unwrap();
                    scans.push((num.unescape_value().unwrap().parse().unwrap(), depth));
                }
                Event::End(e) if e.name().as_ref() == b"scan" => {
                    depth -= 1;
                }
                Event::Text(t) => {
                    if let Some(id) = offset_id.take() {
                        index.push((id, t.unescape().unwrap().parse().unwrap()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        (scans, index)
    }

    #[test_log::test]
    fn test_nesting() -> WriterResult<()> {
        let text = write_document(&[1, 2, 3, 2, 1, 2], false)?;
        let (scans, index) = scan_structure(&text);
        assert_eq!(
            scans,
            vec![(1, 0), (2, 1), (3, 2), (4, 1), (5, 0), (6, 1)]
        );
        assert_eq!(index.len(), 6);
        for (num, offset) in index {
            let tail = &text[offset as usize..];
            assert!(tail.starts_with(&format!("<scan num=\"{num}\"")));
        }
        Ok(())
    }

    #[test_log::test]
    fn test_header_and_precursor() -> WriterResult<()> {
        let text = write_document(&[1, 2], true)?;
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<mzXML"));
        assert!(text.contains("<msRun scanCount=\"2\" startTime=\"PT1S\" endTime=\"PT30S\" >"));
        assert!(text.contains("fileName=\"file:///data/run.raw\" fileType=\"RAWData\""));
        assert!(text.contains("<msManufacturer category=\"msManufacturer\" value=\"Thermo Scientific\" />"));
        assert!(text.contains("<msMassAnalyzer category=\"msMassAnalyzer\" value=\"FTMS\" />"));
        assert!(text.contains("filterLine=\"FTMS + p ESI Full ms2\""));
        assert!(text.contains("injectionTime=\"PT0.5000S\""));
        assert!(text.contains("collisionEnergy=\"35\""));
        assert!(text.contains(
            "<precursorMz precursorScanNum=\"1\" precursorIntensity=\"1000\" precursorCharge=\"2\" activationMethod=\"CID\" >200.5</precursorMz>"
        ));
        assert!(text.contains("<peaks precision=\"32\""));
        assert!(text.contains("compressionType=\"none\""));
        Ok(())
    }

    #[test_log::test]
    fn test_peaks_payload() -> WriterResult<()> {
        let text = write_document(&[1], false)?;
        let start = text.find("compressedLen=\"0\" >").unwrap() + "compressedLen=\"0\" >".len();
        let end = start + text[start..].find("</peaks>").unwrap();
        let bytes = base64::decode(&text[start..end]).unwrap();
        let values = unpack_network_floats(&bytes)?;
        assert_eq!(values, vec![100.0, 10.0, 200.5, 1000.0, 300.25, 50.0]);
        Ok(())
    }

    #[test_log::test]
    fn test_digest_covers_sha1_start_tag() -> WriterResult<()> {
        let text = write_document(&[1, 2, 1], true)?;
        let marker = "<sha1>";
        let cut = text.find(marker).unwrap() + marker.len();
        let mut hasher = SHA1HashingStream::new(io::sink());
        hasher.write_all(text[..cut].as_bytes())?;
        let digest = hasher.hexdigest();
        assert!(text[cut..].starts_with(&format!("{digest}</sha1>")));

        let index_offset_start = text.find("<indexOffset>").unwrap() + "<indexOffset>".len();
        let index_offset_end = text.find("</indexOffset>").unwrap();
        let index_offset: usize = text[index_offset_start..index_offset_end].parse().unwrap();
        assert!(text[index_offset..].starts_with("<index name=\"scan\""));
        assert!(text.ends_with("</mzXML>\n"));
        Ok(())
    }

    #[test_log::test]
    fn test_validation_errors() -> WriterResult<()> {
        let mut writer = MzXMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 2);
        writer.write_scan(&make_scan(2, 1))?;
        assert!(matches!(
            writer.write_scan(&make_scan(1, 1)),
            Err(WriterError::ScanOrder { previous: 2, current: 1 })
        ));
        let mut untyped = make_scan(3, 1);
        untyped.scan_type = ScanType::Undefined;
        assert!(matches!(
            writer.write_scan(&untyped),
            Err(WriterError::UndefinedField { field: "scan type", .. })
        ));
        assert!(matches!(
            writer.close(),
            Err(WriterError::ScanCountMismatch { declared: 2, written: 1 })
        ));

        let mut meta = metadata();
        meta.instrument.manufacturer = Manufacturer::Undefined;
        let mut writer = MzXMLWriterType::new(CountingSink::new(Vec::new()), meta, 1);
        assert!(matches!(
            writer.write_scan(&make_scan(1, 1)),
            Err(WriterError::UnsupportedManufacturer)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_precursor_reference_clamped() -> WriterResult<()> {
        let mut writer = MzXMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 3);
        writer.write_scan(&make_scan(1, 1))?;
        writer.write_scan(&make_scan(2, 1))?;
        let mut ms2 = make_scan(3, 2);
        if let Some(precursor) = ms2.precursor.as_mut() {
            precursor.scan_number = Some(2);
        }
        writer.write_scan(&ms2)?;
        let text = String::from_utf8(writer.into_inner()?).unwrap();
        assert!(text.contains("<precursorMz precursorScanNum=\"2\" "));

        let mut writer = MzXMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 2);
        writer.write_scan(&make_scan(1, 1))?;
        let mut ms2 = make_scan(2, 2);
        if let Some(precursor) = ms2.precursor.as_mut() {
            precursor.scan_number = None;
        }
        writer.write_scan(&ms2)?;
        let text = String::from_utf8(writer.into_inner()?).unwrap();
        assert!(text.contains("<precursorMz precursorScanNum=\"1\" "));
        Ok(())
    }

    #[test_log::test]
    fn test_empty_scan_placeholder() -> WriterResult<()> {
        let mut scan = make_scan(1, 1);
        scan.set_peaks(Vec::new(), Vec::new()).unwrap();
        scan.update_summaries();
        for compress in [false, true] {
            let mut writer =
                MzXMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 1)
                    .with_compression(compress);
            writer.write_scan(&scan)?;
            let text = String::from_utf8(writer.into_inner()?).unwrap();
            assert!(text.contains("peaksCount=\"0\""));
            assert!(text.contains("compressionType=\"none\""));
            assert!(text.contains(&format!(">{EMPTY_ARRAY_PLACEHOLDER}</peaks>")));
        }
        Ok(())
    }

    #[test_log::test]
    fn test_shotgun_and_merge() -> WriterResult<()> {
        let mut writer = MzXMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 3)
            .with_shotgun_fragmentation(true);
        writer.write_scan(&make_scan(1, 1))?;
        let mut ms2 = make_scan(2, 2);
        ms2.activation = ActivationMethod::Undefined;
        ms2.merge = MergeState::Member {
            merged_scan_number: Some(3),
        };
        writer.write_scan(&ms2)?;
        let mut merged = make_scan(3, 2);
        merged.merge = MergeState::Result;
        writer.write_scan(&merged)?;
        let text = String::from_utf8(writer.into_inner()?).unwrap();
        assert!(!text.contains("<precursorMz"));
        assert!(text.contains("merged=\"1\""));
        assert!(text.contains("mergedScanNum=\"3\""));
        let (scans, _) = scan_structure(&text);
        assert_eq!(scans, vec![(1, 0), (2, 1), (3, 0)]);
        Ok(())
    }
}
