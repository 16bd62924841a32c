//! Implements a writer for the indexed mzXML 3.1 format, where product ion scans
//! nest inside the scans they were selected from.

pub mod nesting;
pub mod writer;

pub use crate::io::mzxml::nesting::{should_close_before, ScanNesting};
pub use crate::io::mzxml::writer::{MzXMLWriter, MzXMLWriterType};
