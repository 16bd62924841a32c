use super::SignalError;
use crate::scan::Scan;

/// An inclusive intensity cutoff and what to do with the peaks below it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdSettings {
    pub cutoff: f64,
    /// Drop sub-cutoff peaks when `true`, otherwise zero their intensity in place
    pub discard: bool,
}

impl ThresholdSettings {
    pub fn new(cutoff: f64, discard: bool) -> Self {
        Self { cutoff, discard }
    }

    pub fn apply(&self, scan: &mut Scan) -> Result<(), SignalError> {
        threshold(scan, self.cutoff, self.discard)
    }
}

/**
Apply an inclusive intensity cutoff to `scan`'s peaks.

Peaks at or above `cutoff` are kept unchanged. Peaks below it are removed when `discard`
is `true`, or kept at their m/z with an intensity of zero otherwise. The base peak, total
ion current and observed m/z range are left as they were; call
[`Scan::update_summaries`] if they must describe the thresholded arrays.
*/
pub fn threshold(scan: &mut Scan, cutoff: f64, discard: bool) -> Result<(), SignalError> {
    scan.check_sorted()?;
    let (mz_array, intensity_array) = scan.take_peaks();
    let (mz_array, intensity_array): (Vec<f64>, Vec<f64>) = if discard {
        mz_array
            .into_iter()
            .zip(intensity_array)
            .filter(|(_, intensity)| *intensity >= cutoff)
            .unzip()
    } else {
        let intensity_array = intensity_array
            .into_iter()
            .map(|i| if i >= cutoff { i } else { 0.0 })
            .collect();
        (mz_array, intensity_array)
    };
    scan.set_peaks(mz_array, intensity_array)?;
    scan.is_thresholded = true;
    Ok(())
}
