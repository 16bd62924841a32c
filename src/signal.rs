//! Signal conditioning applied to a [`Scan`](crate::scan::Scan)'s peaks before it is written.
use thiserror::Error;

mod centroid;
mod threshold;

pub use centroid::{
    centroid, centroid_in_range, gaussian_centroid, pick_peaks, CentroidSettings,
    InstrumentClass, DEFAULT_VALID_MZ_RANGE,
};
pub use threshold::{threshold, ThresholdSettings};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("The m/z array is not sorted: {current} at index {index} follows {previous}")]
    UnsortedMZ {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("The m/z array has {mz_len} values but the intensity array has {intensity_len}")]
    LengthMismatch { mz_len: usize, intensity_len: usize },
}
