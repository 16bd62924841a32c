use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::bindata::{EncodedArray, PeakArrayEncoder};
use crate::meta::Detector;
use crate::params::{ControlledVocabulary, ParamCow, ParamLike, Unit};
use crate::scan::{Precursor, Scan};

use super::super::document::{
    validate_scan, DocumentMetadata, DocumentState, ScanLedger, WriterError, WriterResult,
};
use super::super::offset_index::OffsetIndex;
use super::super::sink::CountingSink;
use super::super::traits::ScanWriter;
use super::super::xml_writer::XMLElementWriter;

const MZML_NAMESPACE: &str = "http://psi.hupo.org/schema_revision/mzML_0.99.1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const PSIMS_VERSION: &str = "2.0.2";
const PSIMS_URI: &str = "http://psidev.sourceforge.net/ms/xml/mzdata/psi-ms.2.0.2.obo";

const FILE_CONTENT_TYPE: &str = "MSn spectrum";

macro_rules! ms_term {
    ($name:literal, $accession:literal) => {
        ControlledVocabulary::MS.const_param_ident($name, $accession)
    };
    ($name:literal, $accession:literal, $unit:expr) => {
        ControlledVocabulary::MS.const_param_ident_unit($name, $accession, $unit)
    };
}

const MSN_SPECTRUM: ParamCow<'static> = ms_term!("MSn spectrum", 1000580);
const SHA1_TERM: ParamCow<'static> = ms_term!("SHA-1", 1000569);
const SERIAL_NUMBER: ParamCow<'static> = ms_term!("instrument serial number", 1000529);
const CONVERSION_TO_MZML: ParamCow<'static> = ms_term!("Conversion to mzML", 1000544);
const CENTROID_SPECTRUM: ParamCow<'static> = ms_term!("centroid mass spectrum", 1000127);

const LOWEST_MZ: ParamCow<'static> = ms_term!("lowest m/z value", 1000528);
const HIGHEST_MZ: ParamCow<'static> = ms_term!("highest m/z value", 1000527);
const BASE_PEAK_MZ: ParamCow<'static> = ms_term!("base peak m/z", 1000504);
const BASE_PEAK_INTENSITY: ParamCow<'static> = ms_term!("base peak intensity", 1000505);
const TOTAL_ION_CURRENT: ParamCow<'static> = ms_term!("total ion current", 1000285);

const SELECTED_ION_MZ: ParamCow<'static> = ms_term!("m/z", 1000040);
const CHARGE_STATE: ParamCow<'static> = ms_term!("charge state", 1000041);
const COLLISION_ENERGY: ParamCow<'static> =
    ms_term!("collision energy", 1000045, Unit::Electronvolt);

const SCAN_TIME: ParamCow<'static> = ms_term!("scan time", 1000016, Unit::Second);
const FILTER_STRING: ParamCow<'static> = ms_term!("filter string", 1000512);
const SCAN_LOWER_LIMIT: ParamCow<'static> = ms_term!("scan m/z lower limit", 1000501);
const SCAN_UPPER_LIMIT: ParamCow<'static> = ms_term!("scan m/z upper limit", 1000500);

const FLOAT_32: ParamCow<'static> = ms_term!("32-bit float", 1000521);
const ZLIB_COMPRESSION: ParamCow<'static> = ms_term!("zlib", 1000574);
const NO_COMPRESSION: ParamCow<'static> = ms_term!("no compression", 1000576);
const MZ_ARRAY: ParamCow<'static> = ms_term!("m/z array", 1000514);
const INTENSITY_ARRAY: ParamCow<'static> = ms_term!("intensity array", 1000515);

/// The detector listed when the instrument description has none
const FALLBACK_DETECTOR: Detector = Detector::ElectronMultiplierTube;

/**
An indexed mzML 0.99.1 writer.

Every scan becomes a flat `spectrum` element inside the `spectrumList`, and
tandem spectra point back at their precursor scan through a `spectrumRef`
of the form `S{scan number}`. The file checksum covers everything up to and
including the `</mzML>` end tag, and is written after the spectrum offset index.
*/
#[derive(Debug)]
pub struct MzMLWriterType<W: Write> {
    pub metadata: DocumentMetadata,
    pub state: DocumentState,
    handle: XMLElementWriter<W>,
    ledger: ScanLedger,
    encoder: PeakArrayEncoder,
    digest: Option<String>,
}

impl<W: Write> ScanWriter for MzMLWriterType<W> {
    fn write_scan(&mut self, scan: &Scan) -> WriterResult<()> {
        MzMLWriterType::write_scan(self, scan)
    }

    fn close(&mut self) -> WriterResult<()> {
        MzMLWriterType::close(self)
    }

    fn scans_written(&self) -> u64 {
        self.ledger.written()
    }
}

impl<W: Write> MzMLWriterType<W> {
    /// Prepare to write `scan_count` spectra into `sink`
    pub fn new(sink: CountingSink<W>, metadata: DocumentMetadata, scan_count: u64) -> Self {
        Self {
            metadata,
            state: DocumentState::Start,
            handle: XMLElementWriter::new(sink),
            ledger: ScanLedger::new("spectrum", scan_count),
            encoder: PeakArrayEncoder::new(false),
            digest: None,
        }
    }

    pub fn with_compression(mut self, compress_peaks: bool) -> Self {
        self.encoder = PeakArrayEncoder::new(compress_peaks);
        self
    }

    pub fn offset_index(&self) -> &OffsetIndex {
        &self.ledger.offset_index
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    fn transition_err<T>(&self, to_state: DocumentState) -> WriterResult<T> {
        Err(WriterError::StateTransitionError {
            from_state: self.state,
            to_state,
        })
    }

    fn write_param<P: ParamLike>(&mut self, param: &P) -> WriterResult<()> {
        if !param.is_controlled() {
            self.handle.open("userParam")?;
        } else {
            self.handle.open("cvParam")?;
            if let Some(cv) = param.controlled_vocabulary() {
                self.handle.attr("cvLabel", cv)?;
            }
            self.handle
                .attr("accession", param.curie().unwrap_or_default())?;
        }
        self.handle.attr("name", param.name())?;
        self.handle.attr("value", param.value())?;
        match param.unit() {
            Unit::Unknown => {}
            unit => {
                let (unit_accession, unit_name) = unit.for_param();
                self.handle.attr("unitAccession", unit_accession)?;
                self.handle.attr("unitName", unit_name)?;
            }
        }
        self.handle.close()?;
        Ok(())
    }

    fn write_param_value<V: ToString>(&mut self, term: &ParamCow<'static>, value: V) -> WriterResult<()> {
        self.write_param(&term.with_value(value))
    }

    /// An `id` for the `mzML` element, taken from the first source file's name
    fn document_id(&self) -> String {
        let stem = self
            .metadata
            .source_files
            .first()
            .map(|sf| match sf.name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                _ => sf.name.clone(),
            })
            .unwrap_or_default();
        let id: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if id.is_empty() {
            "run".to_string()
        } else {
            id
        }
    }

    fn start_document(&mut self) -> WriterResult<()> {
        if self.state != DocumentState::Start {
            return self.transition_err(DocumentState::DocumentOpen);
        }
        self.metadata.validate(true)?;
        info!("Writing mzML document with {} spectra", self.ledger.declared);
        self.handle.condense_attributes = true;
        self.handle.write_declaration()?;
        self.handle.open("indexedmzML")?;
        self.handle.attr("xmlns", MZML_NAMESPACE)?;
        self.handle.attr("xmlns:xsi", XSI_NAMESPACE)?;
        self.handle.attr(
            "xsi:schemaLocation",
            format!("{MZML_NAMESPACE} mzML0.99.1_idx.xsd"),
        )?;

        let id = self.document_id();
        self.handle.open("mzML")?;
        self.handle.attr("xmlns", MZML_NAMESPACE)?;
        self.handle.attr("xmlns:xsi", XSI_NAMESPACE)?;
        self.handle.attr(
            "xsi:schemaLocation",
            format!("{MZML_NAMESPACE} mzML0.99.1.xsd"),
        )?;
        self.handle.attr("accession", "")?;
        self.handle.attr("id", id)?;
        self.handle.attr("version", "0.99.1")?;
        self.state = DocumentState::DocumentOpen;
        Ok(())
    }

    fn write_header(&mut self) -> WriterResult<()> {
        if self.state < DocumentState::DocumentOpen {
            self.start_document()?;
        } else {
            return self.transition_err(DocumentState::Header);
        }
        self.write_cv_list()?;
        self.write_file_description()?;
        self.write_sample_list()?;
        self.write_instrument_list()?;
        self.write_software_list()?;
        self.write_data_processing()?;
        self.start_run()?;
        self.state = DocumentState::Header;
        Ok(())
    }

    fn write_cv_list(&mut self) -> WriterResult<()> {
        self.handle.open("cvList")?;
        self.handle.attr("count", 1)?;
        self.handle.open("cv")?;
        self.handle.attr("cvLabel", ControlledVocabulary::MS)?;
        self.handle.attr(
            "fullName",
            "Proteomics Standards Initiative Mass Spectrometry Ontology",
        )?;
        self.handle.attr("version", PSIMS_VERSION)?;
        self.handle.attr("URI", PSIMS_URI)?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_file_description(&mut self) -> WriterResult<()> {
        let format_term = self
            .metadata
            .instrument
            .manufacturer
            .source_file_format()
            .ok_or(WriterError::UnsupportedManufacturer)?;

        self.handle.open("fileDescription")?;
        self.handle.open("fileContent")?;
        self.write_param(&MSN_SPECTRUM)?;
        self.handle.close()?;

        let source_files = self.metadata.source_files.clone();
        self.handle.open("sourceFileList")?;
        self.handle.attr("count", source_files.len())?;
        for (i, sf) in source_files.iter().enumerate() {
            self.handle.open("sourceFile")?;
            self.handle.attr("id", i + 1)?;
            self.handle.attr("sourceFileName", &sf.name)?;
            self.handle.attr("sourceFileLocation", &sf.location)?;
            self.write_param(&format_term)?;
            self.write_param_value(&SHA1_TERM, &sf.sha1)?;
            self.handle.close()?;
        }
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_sample_list(&mut self) -> WriterResult<()> {
        self.handle.open("sampleList")?;
        self.handle.attr("count", 1)?;
        self.handle.open("sample")?;
        self.handle.attr("id", 1)?;
        self.handle.attr("name", "Sample1")?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_component(&mut self, tag: &str, order: usize, param: &ParamCow<'static>) -> WriterResult<()> {
        self.handle.open(tag)?;
        self.handle.attr("order", order)?;
        self.write_param(param)?;
        self.handle.close()?;
        Ok(())
    }

    fn write_instrument_list(&mut self) -> WriterResult<()> {
        let info = self.metadata.instrument.clone();
        let undefined = |field| WriterError::UndefinedField {
            field,
            scan_number: None,
        };
        let source = info.ionization.to_param().ok_or(undefined("ionization"))?;
        let analyzer = info
            .single_analyzer()
            .and_then(|a| a.to_param())
            .ok_or(undefined("analyzer"))?;
        let detector = match info.detector.to_param() {
            Some(term) => term,
            None => {
                warn!(
                    "No detector was described, listing {} in its place",
                    FALLBACK_DETECTOR.name()
                );
                FALLBACK_DETECTOR
                    .to_param()
                    .ok_or(undefined("detector"))?
            }
        };

        self.handle.open("instrumentList")?;
        self.handle.attr("count", 1)?;
        self.handle.open("instrument")?;
        self.handle.attr("id", info.instrument_id())?;
        self.write_param(&info.model_param())?;
        if !info.serial_number.is_empty() {
            self.write_param_value(&SERIAL_NUMBER, &info.serial_number)?;
        }

        self.handle.open("componentList")?;
        self.handle.attr("count", 3)?;
        self.write_component("source", 1, &source)?;
        self.write_component("analyzer", 2, &analyzer)?;
        self.write_component("detector", 3, &detector)?;
        self.handle.close()?;

        self.handle.open("instrumentSoftwareRef")?;
        self.handle.attr("ref", info.acquisition_software.name())?;
        self.handle.close()?;

        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_software_param(&mut self, id: &str, param: &ParamCow<'static>, version: &str) -> WriterResult<()> {
        self.handle.open("software")?;
        self.handle.attr("id", id)?;
        self.handle.open("softwareParam")?;
        self.handle.attr("cvLabel", ControlledVocabulary::MS)?;
        self.handle
            .attr("accession", param.curie().unwrap_or_default())?;
        self.handle.attr("name", id)?;
        self.handle.attr("version", version)?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_software_list(&mut self) -> WriterResult<()> {
        let software = self.metadata.software.clone();
        let info = self.metadata.instrument.clone();
        let acquisition_term = info.acquisition_software.to_param();

        self.handle.open("softwareList")?;
        self.handle
            .attr("count", 1 + acquisition_term.is_some() as usize)?;
        self.write_software_param(&software.id, &software.to_param(), &software.version)?;
        if let Some(term) = acquisition_term {
            self.write_software_param(
                info.acquisition_software.name(),
                &term,
                &info.acquisition_software_version,
            )?;
        } else {
            debug!("No acquisition software was described");
        }
        self.handle.close()?;
        Ok(())
    }

    fn write_processing(&mut self, label: &str, term: &ParamCow<'static>) -> WriterResult<()> {
        let software_id = self.metadata.software.id.clone();
        self.handle.open("dataProcessing")?;
        self.handle.attr("id", format!("{software_id} {label}"))?;
        self.handle.attr("softwareRef", &software_id)?;
        self.handle.open("processingMethod")?;
        self.handle.attr("order", 1)?;
        self.write_param(term)?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_data_processing(&mut self) -> WriterResult<()> {
        let centroided = self.metadata.centroided;
        self.handle.open("dataProcessingList")?;
        self.handle.attr("count", 1 + centroided as usize)?;
        self.write_processing("Conversion", &CONVERSION_TO_MZML)?;
        if centroided {
            self.write_processing("Centroiding", &CENTROID_SPECTRUM)?;
        }
        self.handle.close()?;
        Ok(())
    }

    fn start_run(&mut self) -> WriterResult<()> {
        let instrument_id = self.metadata.instrument.instrument_id();
        self.handle.open("run")?;
        self.handle.attr("id", "Exp01")?;
        self.handle.attr("instrumentRef", instrument_id)?;
        self.handle.attr("sampleRef", 1)?;
        if let Some(timestamp) = self.metadata.run.start_timestamp_str() {
            self.handle.attr("startTimeStamp", timestamp)?;
        }
        let n_files = self.metadata.source_files.len();
        self.handle.open("sourceFileRefList")?;
        self.handle.attr("count", n_files)?;
        for i in 0..n_files {
            self.handle.open("sourceFileRef")?;
            self.handle.attr("ref", i + 1)?;
            self.handle.close()?;
        }
        self.handle.close()?;
        Ok(())
    }

    fn start_spectrum_list(&mut self) -> WriterResult<()> {
        match self.state {
            DocumentState::ScanList => return Ok(()),
            state if state < DocumentState::Header => self.write_header()?,
            DocumentState::Header => {}
            _ => return self.transition_err(DocumentState::ScanList),
        }
        self.handle.open("spectrumList")?;
        self.handle.attr("count", self.ledger.declared)?;
        self.state = DocumentState::ScanList;
        Ok(())
    }

    fn write_precursor(&mut self, scan: &Scan, precursor: &Precursor) -> WriterResult<()> {
        self.handle.open("precursorList")?;
        self.handle.attr("count", 1)?;
        self.handle.open("precursor")?;
        self.handle
            .attr("spectrumRef", format!("S{}", precursor.scan_reference()))?;

        self.handle.open("ionSelection")?;
        self.write_param_value(&SELECTED_ION_MZ, precursor.mz)?;
        if let Some(charge) = precursor.charge.filter(|z| *z > 0) {
            self.write_param_value(&CHARGE_STATE, charge)?;
        }
        self.handle.close()?;

        self.handle.open("activation")?;
        if let Some(term) = scan.activation.to_param() {
            self.write_param(&term)?;
        }
        self.write_param_value(&COLLISION_ENERGY, precursor.collision_energy)?;
        self.handle.close()?;

        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_scan_description(&mut self, scan: &Scan) -> WriterResult<()> {
        let instrument_id = self.metadata.instrument.instrument_id();
        self.handle.open("scan")?;
        self.handle.attr("instrumentRef", instrument_id)?;
        self.write_param_value(&SCAN_TIME, scan.retention_time)?;
        if let Some(term) = scan.scan_type.to_param() {
            self.write_param(&term)?;
        }
        if let Some(term) = scan.polarity.to_param() {
            self.write_param(&term)?;
        }
        if self.metadata.instrument.manufacturer.is_thermo() {
            if let Some(filter_line) = scan.filter_line.as_deref() {
                self.write_param_value(&FILTER_STRING, filter_line)?;
            }
        }
        self.handle.open("selectionWindowList")?;
        self.handle.attr("count", 1)?;
        self.handle.open("selectionWindow")?;
        self.write_param_value(&SCAN_LOWER_LIMIT, scan.start_mz)?;
        self.write_param_value(&SCAN_UPPER_LIMIT, scan.end_mz)?;
        self.handle.close()?;
        self.handle.close()?;
        self.handle.close()?;
        Ok(())
    }

    fn write_binary_data_array(&mut self, array: &EncodedArray, kind: &ParamCow<'static>) -> WriterResult<()> {
        self.handle.open("binaryDataArray")?;
        self.handle.attr("arrayLength", array.array_length)?;
        self.handle.attr("encodedLength", array.encoded_length())?;
        self.write_param(&FLOAT_32)?;
        if array.compressed {
            self.write_param(&ZLIB_COMPRESSION)?;
        } else {
            self.write_param(&NO_COMPRESSION)?;
        }
        self.write_param(kind)?;
        self.handle.element("binary", &array.text)?;
        self.handle.close()?;
        Ok(())
    }

    /// Write out a single scan as a `spectrum` element
    pub fn write_scan(&mut self, scan: &Scan) -> WriterResult<()> {
        self.start_spectrum_list()?;
        validate_scan(scan, true)?;
        self.ledger.check_order(scan.scan_number)?;
        let encoded = self.encoder.encode_scan(scan)?;
        if scan.is_empty() {
            debug!("Spectrum {} has no peaks", scan.scan_number);
        }

        let offset = self.handle.open("spectrum")?;
        self.handle.attr("scanNumber", scan.scan_number)?;
        self.handle.attr("id", format!("S{}", scan.scan_number))?;
        self.handle.attr("msLevel", scan.ms_level)?;
        self.write_param(&MSN_SPECTRUM)?;

        self.handle.open("spectrumDescription")?;
        if scan.is_centroided {
            self.write_param(&CENTROID_SPECTRUM)?;
        }
        self.write_param_value(&LOWEST_MZ, scan.min_observed_mz)?;
        self.write_param_value(&HIGHEST_MZ, scan.max_observed_mz)?;
        self.write_param_value(&BASE_PEAK_MZ, scan.base_peak_mz)?;
        self.write_param_value(&BASE_PEAK_INTENSITY, scan.base_peak_intensity)?;
        self.write_param_value(&TOTAL_ION_CURRENT, scan.total_ion_current)?;
        if scan.ms_level >= 2 {
            let default_precursor = Precursor::default();
            let precursor = scan.precursor.as_ref().unwrap_or(&default_precursor);
            self.write_precursor(scan, precursor)?;
        }
        self.write_scan_description(scan)?;
        self.handle.close()?;

        self.write_binary_data_array(&encoded.mz, &MZ_ARRAY)?;
        self.write_binary_data_array(&encoded.intensity, &INTENSITY_ARRAY)?;
        self.handle.close()?;

        self.ledger.record(scan.scan_number, offset);
        Ok(())
    }

    fn close_spectrum_list(&mut self) -> WriterResult<()> {
        self.start_spectrum_list()?;
        // spectrumList, run, mzML
        for _ in 0..3 {
            self.handle.close()?;
        }
        self.state = DocumentState::ScanListClosed;
        Ok(())
    }

    fn write_index_list(&mut self) -> WriterResult<()> {
        if self.state != DocumentState::ScanListClosed {
            return self.transition_err(DocumentState::IndexList);
        }
        self.state = DocumentState::IndexList;
        self.handle.flush()?;
        let digest = self.handle.hexdigest();
        info!("mzML document SHA-1: {digest}");

        let index_offset = self.handle.open("index")?;
        self.handle.attr("name", &self.ledger.offset_index.name)?;
        let entries: Vec<(u64, u64)> = self
            .ledger
            .offset_index
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect();
        for (scan_number, offset) in entries {
            self.handle.open("offset")?;
            self.handle.attr("scanNumber", scan_number)?;
            self.handle.data(offset)?;
            self.handle.close()?;
        }
        self.handle.close()?;
        self.handle.element("indexOffset", index_offset)?;
        self.handle.element("fileContentType", FILE_CONTENT_TYPE)?;
        self.handle.element("fileChecksum", &digest)?;
        self.digest = Some(digest);
        // indexedmzML
        self.handle.close()?;
        Ok(())
    }

    /**
    Close the spectrum list, the run and the `mzML` element, then write the
    offset index and checksum.

    Fails with [`WriterError::ScanCountMismatch`] if fewer or more spectra were
    written than the header declared.
    */
    pub fn close(&mut self) -> WriterResult<()> {
        if self.state == DocumentState::End {
            return Ok(());
        }
        if self.state < DocumentState::ScanListClosed {
            self.close_spectrum_list()?;
        }
        self.ledger.check_count()?;
        self.write_index_list()?;
        self.handle.flush()?;
        self.state = DocumentState::End;
        Ok(())
    }

    pub fn into_inner(mut self) -> WriterResult<W> {
        self.close()?;
        Ok(self.handle.finish()?)
    }
}

pub type MzMLWriter = MzMLWriterType<fs::File>;

impl MzMLWriterType<fs::File> {
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
    use crate::bindata::EMPTY_ARRAY_PLACEHOLDER;
    use crate::io::utils::SHA1HashingStream;
    use crate::io::compression::decompress_if_gzipped;
    use crate::meta::{InstrumentInfo, Manufacturer, RunInfo, SourceFile};
    use crate::scan::{ActivationMethod, Ionization, MassAnalyzer, Polarity, ScanType};
    use chrono::DateTime;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;

    fn metadata() -> DocumentMetadata {
        let run = RunInfo::new(0.5, 3.0).with_start_timestamp(
            DateTime::parse_from_rfc3339("2008-03-01T12:30:00+00:00").unwrap(),
        );
        DocumentMetadata::new(
            InstrumentInfo::new(
                Manufacturer::Thermo,
                "LTQ FT",
                Ionization::Electrospray,
                vec![MassAnalyzer::FourierTransform],
            )
            .with_serial_number("SN0042"),
        )
        .with_source_file(SourceFile::new(
            "sample.RAW",
            "file:///data",
            "0123456789abcdef0123456789abcdef01234567",
        ))
        .with_run(run)
    }

    fn make_scan(scan_number: u64, ms_level: u8) -> Scan {
        let mut scan = Scan::new(scan_number, ms_level)
            .with_peaks(vec![150.0, 250.0, 350.0], vec![5.0, 500.0, 50.0])
            .unwrap();
        scan.polarity = Polarity::Positive;
        scan.scan_type = if ms_level > 1 {
            ScanType::ProductIonScan
        } else {
            ScanType::Full
        };
        scan.start_mz = 100.0;
        scan.end_mz = 2000.0;
        scan.retention_time = scan_number as f64 * 0.5;
        scan.filter_line = Some("FTMS + p ESI Full ms".to_string());
        if ms_level > 1 {
            scan.activation = ActivationMethod::CollisionInducedDissociation;
            scan.precursor = Some(Precursor {
                scan_number: Some(scan_number - 1),
                mz: 250.0,
                charge: Some(3),
                collision_energy: 30.0,
                ..Default::default()
            });
        }
        scan.update_summaries();
        scan
    }

    fn write_document(sink: CountingSink<Vec<u8>>, n: u64) -> WriterResult<Vec<u8>> {
        let mut writer = MzMLWriterType::new(sink, metadata(), n).with_compression(true);
        for i in 1..=n {
            let level = if i % 2 == 0 { 2 } else { 1 };
            writer.write_scan(&make_scan(i, level))?;
        }
        writer.into_inner()
    }

    fn index_entries(text: &str) -> Vec<(u64, u64)> {
        let mut reader = Reader::from_str(text);
        let mut entries = Vec::new();
        let mut current = None;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"offset" => {
                    let attr = e.try_get_attribute("scanNumber").unwrap().unwrap();
                    current = Some(attr.unescape_value().unwrap().parse::<u64>().unwrap());
                }
                Event::Text(t) => {
                    if let Some(scan_number) = current.take() {
                        entries.push((scan_number, t.unescape().unwrap().parse().unwrap()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        entries
    }

    #[test_log::test]
    fn test_document_structure() -> WriterResult<()> {
        let buf = write_document(CountingSink::new(Vec::new()), 3)?;
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<indexedmzML"));
        assert!(text.contains("version=\"0.99.1\""));
        assert!(text.contains("id=\"sample\""));
        assert!(text.contains(
            "<cvParam cvLabel=\"MS\" accession=\"MS:1000563\" name=\"Thermo RAW format\" value=\"\" />"
        ));
        assert!(text.contains("name=\"instrument serial number\" value=\"SN0042\""));
        assert!(text.contains("accession=\"MS:1000111\""));
        assert!(text.contains("startTimeStamp=\"2008-03-01T12:30:00Z\""));
        assert!(text.contains("<spectrumList count=\"3\" >"));
        assert!(text.contains("<precursor spectrumRef=\"S1\" >"));
        assert!(text.contains("name=\"charge state\" value=\"3\""));
        assert!(text.contains(
            "accession=\"MS:1000045\" name=\"collision energy\" value=\"30\" unitAccession=\"UO:0000266\" unitName=\"electronvolt\""
        ));
        assert!(text.contains("name=\"scan time\" value=\"1\" unitAccession=\"UO:0000010\""));
        assert!(text.contains("name=\"filter string\" value=\"FTMS + p ESI Full ms\""));
        assert!(text.contains("<fileContentType>MSn spectrum</fileContentType>"));

        let entries = index_entries(&text);
        assert_eq!(entries.len(), 3);
        for (scan_number, offset) in entries {
            assert!(text[offset as usize..]
                .starts_with(&format!("<spectrum scanNumber=\"{scan_number}\" id=\"S{scan_number}\"")));
        }

        let start = text.find("<indexOffset>").unwrap() + "<indexOffset>".len();
        let end = text.find("</indexOffset>").unwrap();
        let index_offset: usize = text[start..end].parse().unwrap();
        assert!(text[index_offset..].starts_with("<index name=\"spectrum\""));
        Ok(())
    }

    #[test_log::test]
    fn test_checksum_covers_mzml() -> WriterResult<()> {
        let buf = write_document(CountingSink::new(Vec::new()), 2)?;
        let text = String::from_utf8(buf).unwrap();
        let cut = text.find("</mzML>").unwrap() + "</mzML>".len();
        let mut hasher = SHA1HashingStream::new(io::sink());
        hasher.write_all(text[..cut].as_bytes())?;
        let expected = format!("<fileChecksum>{}</fileChecksum>", hasher.hexdigest());
        assert!(text.contains(&expected));
        Ok(())
    }

    #[test_log::test]
    fn test_gzip_offsets_are_logical() -> WriterResult<()> {
        let plain = write_document(CountingSink::new(Vec::new()), 2)?;
        let compressed = write_document(CountingSink::new_gzipped(Vec::new()), 2)?;
        assert_ne!(plain, compressed);
        let mut inflated = Vec::new();
        decompress_if_gzipped(io::Cursor::new(compressed))?.read_to_end(&mut inflated)?;
        assert_eq!(plain, inflated);
        Ok(())
    }

    #[test_log::test]
    fn test_empty_spectrum_placeholder() -> WriterResult<()> {
        let mut scan = make_scan(1, 1);
        scan.set_peaks(Vec::new(), Vec::new()).unwrap();
        scan.update_summaries();
        let mut writer = MzMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 1)
            .with_compression(true);
        writer.write_scan(&scan)?;
        let text = String::from_utf8(writer.into_inner()?).unwrap();
        assert_eq!(
            text.matches("<binaryDataArray arrayLength=\"0\" encodedLength=\"12\"").count(),
            2
        );
        assert_eq!(text.matches(EMPTY_ARRAY_PLACEHOLDER).count(), 2);
        assert!(text.contains("accession=\"MS:1000576\""));
        assert_eq!(index_entries(&text).len(), 1);
        Ok(())
    }

    #[test_log::test]
    fn test_centroiding_processing_term() -> WriterResult<()> {
        let mut meta = metadata();
        meta.centroided = true;
        let mut writer = MzMLWriterType::new(CountingSink::new(Vec::new()), meta, 1);
        let mut scan = make_scan(1, 1);
        scan.is_centroided = true;
        writer.write_scan(&scan)?;
        let text = String::from_utf8(writer.into_inner()?).unwrap();
        assert!(text.contains("<dataProcessingList count=\"2\" >"));
        let term = "accession=\"MS:1000127\" name=\"centroid mass spectrum\"";
        // once under dataProcessing and once in the spectrum description
        assert_eq!(text.matches(term).count(), 2);
        assert!(!text.contains("Centroid Mass Spectrum"));
        Ok(())
    }

    #[test_log::test]
    fn test_rejects_unsupported_metadata() -> WriterResult<()> {
        let mut meta = metadata();
        meta.instrument.analyzers.push(MassAnalyzer::IonTrap);
        let mut writer = MzMLWriterType::new(CountingSink::new(Vec::new()), meta, 1);
        assert!(matches!(
            writer.write_scan(&make_scan(1, 1)),
            Err(WriterError::UnsupportedAnalyzerCount(2))
        ));

        let mut writer = MzMLWriterType::new(CountingSink::new(Vec::new()), metadata(), 1);
        let mut scan = make_scan(1, 2);
        scan.activation = ActivationMethod::Undefined;
        assert!(matches!(
            writer.write_scan(&scan),
            Err(WriterError::UndefinedField {
                field: "activation method",
                scan_number: Some(1)
            })
        ));
        Ok(())
    }
}
