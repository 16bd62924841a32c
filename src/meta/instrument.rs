use std::fmt::Display;

use crate::params::{ControlledVocabulary, Param, ParamCow};
use crate::scan::{Ionization, MassAnalyzer};

/// The company that built the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Manufacturer {
    Thermo,
    ThermoScientific,
    ThermoFinnigan,
    Waters,
    AbiSciex,
    Agilent,
    #[default]
    Undefined,
}

impl Manufacturer {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Thermo => "Thermo",
            Self::ThermoScientific => "Thermo Scientific",
            Self::ThermoFinnigan => "Thermo Finnigan",
            Self::Waters => "Waters",
            Self::AbiSciex => "ABI / SCIEX",
            Self::Agilent => "Agilent",
            Self::Undefined => "unknown",
        }
    }

    pub const fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// Whether scans from this manufacturer carry a Thermo filter line
    pub const fn is_thermo(&self) -> bool {
        matches!(
            self,
            Self::Thermo | Self::ThermoScientific | Self::ThermoFinnigan
        )
    }

    /// The term naming the native file format this manufacturer's software writes
    pub const fn source_file_format(&self) -> Option<ParamCow<'static>> {
        let cv = ControlledVocabulary::MS;
        match self {
            Self::Thermo | Self::ThermoScientific | Self::ThermoFinnigan => {
                Some(cv.const_param_ident("Thermo RAW format", 1000563))
            }
            Self::Waters => Some(cv.const_param_ident("Waters raw format", 1000526)),
            Self::AbiSciex => Some(cv.const_param_ident("ABI WIFF format", 1000562)),
            Self::Agilent => Some(cv.const_param_ident("Agilent MassHunter format", 1001509)),
            Self::Undefined => None,
        }
    }
}

impl Display for Manufacturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The detector type. No acquisition backend reports one reliably, so most
/// instruments leave this `Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Detector {
    ElectronMultiplier,
    ElectronMultiplierTube,
    Photomultiplier,
    MicrochannelPlate,
    Inductive,
    #[default]
    Undefined,
}

impl Detector {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ElectronMultiplier => "electron multiplier",
            Self::ElectronMultiplierTube => "electron multiplier tube",
            Self::Photomultiplier => "photomultiplier",
            Self::MicrochannelPlate => "microchannel plate detector",
            Self::Inductive => "inductive detector",
            Self::Undefined => "unknown",
        }
    }

    pub const fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        let cv = ControlledVocabulary::MS;
        match self {
            Self::ElectronMultiplier => Some(cv.const_param_ident(self.name(), 1000253)),
            Self::ElectronMultiplierTube => Some(cv.const_param_ident(self.name(), 1000111)),
            Self::Photomultiplier => Some(cv.const_param_ident(self.name(), 1000116)),
            Self::MicrochannelPlate => Some(cv.const_param_ident(self.name(), 1000114)),
            Self::Inductive => Some(cv.const_param_ident(self.name(), 1000624)),
            Self::Undefined => None,
        }
    }
}

/// The vendor software that controlled the acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AcquisitionSoftware {
    Xcalibur,
    MassLynx,
    Analyst,
    AnalystQS,
    MassHunter,
    #[default]
    Undefined,
}

impl AcquisitionSoftware {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Xcalibur => "Xcalibur",
            Self::MassLynx => "MassLynx",
            Self::Analyst => "Analyst",
            Self::AnalystQS => "AnalystQS",
            Self::MassHunter => "MassHunter",
            Self::Undefined => "unknown",
        }
    }

    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        let cv = ControlledVocabulary::MS;
        match self {
            Self::Xcalibur => Some(cv.const_param_ident("Xcalibur", 1000532)),
            Self::MassLynx => Some(cv.const_param_ident("MassLynx", 1000534)),
            Self::Analyst | Self::AnalystQS => Some(cv.const_param_ident("Analyst", 1000551)),
            Self::MassHunter => Some(cv.const_param_ident("MassHunter", 1000678)),
            Self::Undefined => None,
        }
    }
}

impl Display for AcquisitionSoftware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const INSTRUMENT_MODEL: ParamCow<'static> =
    ControlledVocabulary::MS.const_param_ident("instrument model", 1000031);

/// Describes the instrument that acquired a run, as reported by a
/// [`ScanSource`](crate::io::ScanSource).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentInfo {
    pub manufacturer: Manufacturer,
    /// The model name, e.g. "LTQ Orbitrap"
    pub model: String,
    /// A specific controlled vocabulary term for the model, if the source knows it
    pub model_term: Option<Param>,
    pub ionization: Ionization,
    /// Hybrid instruments may list more than one analyzer
    pub analyzers: Vec<MassAnalyzer>,
    pub detector: Detector,
    pub name: String,
    pub serial_number: String,
    pub hardware_version: String,
    pub acquisition_software: AcquisitionSoftware,
    pub acquisition_software_version: String,
}

impl InstrumentInfo {
    pub fn new(
        manufacturer: Manufacturer,
        model: impl Into<String>,
        ionization: Ionization,
        analyzers: Vec<MassAnalyzer>,
    ) -> Self {
        Self {
            manufacturer,
            model: model.into(),
            ionization,
            analyzers,
            ..Default::default()
        }
    }

    pub fn with_acquisition_software(
        mut self,
        software: AcquisitionSoftware,
        version: impl Into<String>,
    ) -> Self {
        self.acquisition_software = software;
        self.acquisition_software_version = version.into();
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    /// The analyzer, when exactly one is listed
    pub fn single_analyzer(&self) -> Option<MassAnalyzer> {
        match self.analyzers.as_slice() {
            [analyzer] => Some(*analyzer),
            _ => None,
        }
    }

    /// The term describing the model, falling back to the generic model term
    /// carrying the model name as its value
    pub fn model_param(&self) -> Param {
        match &self.model_term {
            Some(term) => term.clone(),
            None => INSTRUMENT_MODEL.with_value(&self.model),
        }
    }

    /// An identifier for the instrument usable as an XML `id`
    pub fn instrument_id(&self) -> String {
        let id: String = self
            .model
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if id.is_empty() {
            "instrument".to_string()
        } else {
            id
        }
    }
}
