//! Run-level metadata: the instrument, the source files and the software involved.
pub mod file_description;
pub mod instrument;
pub mod run;
pub mod software;

pub use crate::meta::file_description::{directory_uri, SourceFile};
pub use crate::meta::instrument::{AcquisitionSoftware, Detector, InstrumentInfo, Manufacturer};
pub use crate::meta::run::RunInfo;
pub use crate::meta::software::Software;
