//! The scan data model handed from a [`ScanSource`](crate::io::ScanSource) to a document writer.
pub mod scan_properties;
pub mod scan_types;

pub use scan_properties::{
    ActivationMethod, CoordinateName, CoordinateScheme, Ionization, MassAnalyzer, Polarity,
    ScanType, UnknownTagError,
};
pub use scan_types::{MergeState, NativeScanRef, Precursor, Scan, ScanCoordinate, ScanOrigin};
