//! The closed sets of tags that describe how a scan was acquired.
//!
//! Every tag enumeration carries an `Undefined` variant which is the default. Document
//! writers refuse to emit an undefined tag where the output format requires one.
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::params::{ControlledVocabulary, ParamCow};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{value:?} is not a recognized {kind}")]
pub struct UnknownTagError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            #[default]
            Undefined,
        }

        impl $name {
            /// The label used for this tag in mzXML attribute values
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Undefined => "unknown",
                }
            }

            pub const fn is_defined(&self) -> bool {
                !matches!(self, Self::Undefined)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = UnknownTagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(UnknownTagError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

macro_rules! term {
    ($name:literal, $accession:literal) => {
        Some(ControlledVocabulary::MS.const_param_ident($name, $accession))
    };
}

/// The polarity of the ions a scan observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    Positive,
    Negative,
    #[default]
    Unknown,
}

impl Polarity {
    /// The mzXML `polarity` attribute value
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
            Self::Unknown => "any",
        }
    }

    pub const fn is_defined(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        match self {
            Self::Positive => term!("positive scan", 1000130),
            Self::Negative => term!("negative scan", 1000129),
            Self::Unknown => None,
        }
    }

    pub fn from_charge(charge: i32) -> Polarity {
        match charge.signum() {
            1 => Self::Positive,
            -1 => Self::Negative,
            _ => Self::Unknown,
        }
    }
}

impl Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

tag_enum! {
    /// The mass analyzer that separated the ions
    pub enum MassAnalyzer {
        IonTrap => "ITMS",
        TripleQuadrupole => "TQMS",
        SingleQuadrupole => "SQMS",
        TimeOfFlight => "TOFMS",
        FourierTransform => "FTMS",
        Sector => "SECTOR",
        QuadrupoleTimeOfFlight => "QTOF",
        TandemQuadrupole => "TANDEM_QUAD",
    }
}

impl MassAnalyzer {
    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        match self {
            Self::IonTrap => term!("ion trap", 1000264),
            Self::TripleQuadrupole | Self::SingleQuadrupole | Self::TandemQuadrupole => {
                term!("quadrupole", 1000081)
            }
            Self::TimeOfFlight | Self::QuadrupoleTimeOfFlight => term!("time-of-flight", 1000084),
            Self::FourierTransform => {
                term!("fourier transform ion cyclotron resonance mass spectrometer", 1000079)
            }
            Self::Sector => term!("magnetic sector", 1000080),
            Self::Undefined => None,
        }
    }
}

tag_enum! {
    /// The ionization method of the ion source
    pub enum Ionization {
        ElectronIonization => "EI",
        ChemicalIonization => "CI",
        FastAtomBombardment => "FAB",
        Electrospray => "ESI",
        AtmosphericPressureChemicalIonization => "APCI",
        Nanoelectrospray => "NSI",
        Thermospray => "TSP",
        FieldDesorption => "FD",
        MatrixAssistedLaserDesorption => "MALDI",
        GlowDischarge => "GD",
        MicrofluidicChip => "MS_CHIP",
    }
}

impl Ionization {
    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        match self {
            Self::ElectronIonization => term!("electron ionization", 1000389),
            Self::ChemicalIonization => term!("chemical ionization", 1000386),
            Self::FastAtomBombardment => term!("fast atom bombardment ionization", 1000074),
            Self::Electrospray => term!("electrospray ionization", 1000073),
            Self::AtmosphericPressureChemicalIonization => {
                term!("atmospheric pressure chemical ionization", 1000070)
            }
            Self::Nanoelectrospray | Self::MicrofluidicChip => term!("nanoelectrospray", 1000398),
            Self::Thermospray => term!("thermospray inlet", 1000069),
            Self::FieldDesorption => term!("field desorption", 1000257),
            Self::MatrixAssistedLaserDesorption => {
                term!("matrix-assisted laser desorption ionization", 1000075)
            }
            Self::GlowDischarge => term!("glow discharge ionization", 1000259),
            Self::Undefined => None,
        }
    }
}

tag_enum! {
    /// The kind of acquisition the instrument performed, as reported by the vendor
    pub enum ScanType {
        Full => "Full",
        SelectedIonMonitoring => "SIM",
        SelectedReactionMonitoring => "SRM",
        ConsecutiveReactionMonitoring => "CRM",
        Zoom => "Z",
        Q1MS => "Q1MS",
        Q3MS => "Q3MS",
        Q1Scan => "Q1 Scan",
        Q1MI => "Q1 MI",
        Q3Scan => "Q3 Scan",
        Q3MI => "Q3 MI",
        MRM => "MRM",
        PrecursorScan => "Precursor Scan",
        ProductIonScan => "Product Ion Scan",
        NeutralLossScan => "Neutral Loss Scan",
        TOFMS1 => "TOF MS1",
        TOFMS2 => "TOF MS2",
        TOFPrecursorIonScan => "TOF Precursor Ion Scan",
        EnhancedProductIon => "EPI",
        EnhancedResolution => "ER",
        MS3 => "MS3",
        TimeDelayedFragmentation => "TDF",
        EnhancedMS => "EMS",
        EnhancedMultiCharge => "EMC",
        HighResolution => "HighResolution",
        MultipleReaction => "MultipleReaction",
        NeutralGain => "NeutralGain",
        NeutralLoss => "NeutralLoss",
        PrecursorIon => "PrecursorIon",
        MS1SurveyScan => "MS1SurveyScan",
        ProductIon => "ProductIon",
        SelectedIon => "SelectedIon",
        TotalIon => "TotalIon",
        Calibration => "calibration",
    }
}

impl ScanType {
    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        match self {
            Self::Full
            | Self::Q1MS
            | Self::Q3MS
            | Self::Q1Scan
            | Self::Q3Scan
            | Self::TOFMS1
            | Self::EnhancedMS
            | Self::EnhancedResolution
            | Self::HighResolution
            | Self::MS1SurveyScan
            | Self::TotalIon
            | Self::Calibration => term!("full scan", 1000498),
            Self::Zoom => term!("zoom scan", 1000497),
            Self::SelectedIonMonitoring | Self::Q1MI | Self::Q3MI | Self::SelectedIon => {
                term!("selected ion monitoring", 1000205)
            }
            Self::SelectedReactionMonitoring | Self::MRM | Self::MultipleReaction => {
                term!("selected reaction monitoring", 1000206)
            }
            Self::ConsecutiveReactionMonitoring => term!("consecutive reaction monitoring", 1000244),
            Self::PrecursorScan | Self::TOFPrecursorIonScan | Self::PrecursorIon => {
                term!("precursor ion spectrum", 1000341)
            }
            Self::ProductIonScan
            | Self::TOFMS2
            | Self::EnhancedProductIon
            | Self::MS3
            | Self::TimeDelayedFragmentation
            | Self::EnhancedMultiCharge
            | Self::ProductIon => term!("product ion spectrum", 1000343),
            Self::NeutralLossScan | Self::NeutralLoss => {
                term!("constant neutral loss spectrum", 1000326)
            }
            Self::NeutralGain => term!("constant neutral gain spectrum", 1000325),
            Self::Undefined => None,
        }
    }
}

tag_enum! {
    /// The method used to fragment the precursor ion
    pub enum ActivationMethod {
        CollisionInducedDissociation => "CID",
        MultiphotonDissociation => "MPD",
        ElectronCaptureDissociation => "ECD",
        PulsedQDissociation => "PQD",
        ElectronTransferDissociation => "ETD",
        ElectronTransferSupplementalActivation => "ETD+SA",
        HigherEnergyCollisionalDissociation => "HCD",
        SupplementalActivation => "SA",
        ProtonTransferReaction => "PTR",
    }
}

impl ActivationMethod {
    pub const fn to_param(&self) -> Option<ParamCow<'static>> {
        match self {
            Self::CollisionInducedDissociation => term!("collision-induced dissociation", 1000133),
            Self::MultiphotonDissociation => term!("photodissociation", 1000435),
            Self::ElectronCaptureDissociation => term!("electron capture dissociation", 1000250),
            Self::PulsedQDissociation => term!("pulsed q dissociation", 1000599),
            Self::ElectronTransferDissociation | Self::ElectronTransferSupplementalActivation => {
                term!("electron transfer dissociation", 1000598)
            }
            Self::HigherEnergyCollisionalDissociation => {
                term!("beam-type collision-induced dissociation", 1000422)
            }
            Self::SupplementalActivation => {
                term!("supplemental collision-induced dissociation", 1002679)
            }
            Self::ProtonTransferReaction => term!("dissociation method", 1000044),
            Self::Undefined => None,
        }
    }
}

/// The vendor scheme a [`NativeScanRef`](crate::scan::NativeScanRef) is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordinateScheme {
    MassLynx,
    Analyst,
    MassHunter,
}

impl CoordinateScheme {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MassLynx => "Waters",
            Self::Analyst => "ABI / SCIEX",
            Self::MassHunter => "Agilent",
        }
    }
}

/// The name of one component of a vendor-native scan coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordinateName {
    MassLynxFunction,
    MassLynxProcess,
    MassLynxScan,
    MassLynxTransition,
    AnalystSample,
    AnalystPeriod,
    AnalystExperiment,
    AnalystCycle,
    MassHunterScan,
}

impl CoordinateName {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MassLynxFunction => "function",
            Self::MassLynxProcess => "process",
            Self::MassLynxScan => "scan",
            Self::MassLynxTransition => "transition",
            Self::AnalystSample => "sample",
            Self::AnalystPeriod => "period",
            Self::AnalystExperiment => "experiment",
            Self::AnalystCycle => "cycle",
            Self::MassHunterScan => "scan",
        }
    }

    pub const fn scheme(&self) -> CoordinateScheme {
        match self {
            Self::MassLynxFunction
            | Self::MassLynxProcess
            | Self::MassLynxScan
            | Self::MassLynxTransition => CoordinateScheme::MassLynx,
            Self::AnalystSample
            | Self::AnalystPeriod
            | Self::AnalystExperiment
            | Self::AnalystCycle => CoordinateScheme::Analyst,
            Self::MassHunterScan => CoordinateScheme::MassHunter,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::ParamLike;

    #[test]
    fn test_tag_names_round_trip() {
        for analyzer in [
            MassAnalyzer::IonTrap,
            MassAnalyzer::FourierTransform,
            MassAnalyzer::TandemQuadrupole,
        ] {
            assert_eq!(analyzer.name().parse::<MassAnalyzer>().unwrap(), analyzer);
        }
        assert_eq!(
            "ETD+SA".parse::<ActivationMethod>().unwrap(),
            ActivationMethod::ElectronTransferSupplementalActivation
        );
        let err = "XYZ".parse::<Ionization>().unwrap_err();
        assert_eq!(err.kind, "Ionization");
    }

    #[test]
    fn test_undefined_has_no_term() {
        assert!(!ScanType::default().is_defined());
        assert!(ScanType::Undefined.to_param().is_none());
        assert!(ActivationMethod::Undefined.to_param().is_none());
        assert!(Polarity::Unknown.to_param().is_none());
        assert_eq!(ScanType::Undefined.name(), "unknown");
        assert_eq!(Polarity::Unknown.name(), "any");
    }

    #[test]
    fn test_terms() {
        let term = ActivationMethod::HigherEnergyCollisionalDissociation
            .to_param()
            .unwrap();
        assert_eq!(term.curie().as_deref(), Some("MS:1000422"));
        let term = Polarity::Negative.to_param().unwrap();
        assert_eq!(term.name(), "negative scan");
        assert_eq!(Polarity::from_charge(-2), Polarity::Negative);
        assert_eq!(CoordinateName::AnalystCycle.scheme(), CoordinateScheme::Analyst);
    }
}
