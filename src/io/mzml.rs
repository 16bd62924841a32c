//! Implements a writer for the PSI-MS indexed mzML 0.99.1 format, one flat
//! `spectrum` element per scan.

pub mod writer;

pub use crate::io::mzml::writer::{MzMLWriter, MzMLWriterType};
