//! Read Mascot Generic Format peak lists as a source of centroided tandem scans.

mod reader;

pub use reader::{is_mgf, MGFError, MGFParserState, MGFScanDefaults, MGFScanSource};
