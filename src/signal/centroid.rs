use std::f64::consts::LN_2;

use log::debug;

use super::SignalError;
use crate::scan::{MassAnalyzer, Scan};

/// The m/z range outside of which centroids are rejected unless configured otherwise
pub const DEFAULT_VALID_MZ_RANGE: (f64, f64) = (0.0, 2000.0);

/// The family of mass analyzer, which decides how peak width grows with m/z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstrumentClass {
    TimeOfFlight,
    FourierTransform,
    OrbitalTrap,
    /// Anything else is treated like a time-of-flight instrument
    Other,
}

impl InstrumentClass {
    /// The presumed resolving power at m/z 400
    pub const fn resolution_at_400(&self) -> f64 {
        match self {
            Self::FourierTransform => 100000.0,
            Self::OrbitalTrap => 50000.0,
            Self::TimeOfFlight | Self::Other => 10000.0,
        }
    }

    /// The full width at half maximum of a peak at `mz`
    pub fn fwhm(&self, mz: f64) -> f64 {
        let res400 = self.resolution_at_400();
        match self {
            Self::FourierTransform => mz * mz / (400.0 * res400),
            Self::OrbitalTrap => mz * mz.sqrt() / (20.0 * res400),
            Self::TimeOfFlight | Self::Other => mz / res400,
        }
    }

    pub fn from_analyzer(analyzer: MassAnalyzer) -> Self {
        match analyzer {
            MassAnalyzer::FourierTransform => Self::FourierTransform,
            MassAnalyzer::TimeOfFlight | MassAnalyzer::QuadrupoleTimeOfFlight => Self::TimeOfFlight,
            _ => Self::Other,
        }
    }
}

/// Configures centroiding during conversion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CentroidSettings {
    /// When `None`, the class is inferred from each scan's analyzer
    pub instrument_class: Option<InstrumentClass>,
    /// Inclusive bounds on accepted centroid m/z
    pub valid_mz_range: (f64, f64),
}

impl Default for CentroidSettings {
    fn default() -> Self {
        Self {
            instrument_class: None,
            valid_mz_range: DEFAULT_VALID_MZ_RANGE,
        }
    }
}

impl CentroidSettings {
    pub fn instrument_class_for(&self, scan: &Scan) -> InstrumentClass {
        self.instrument_class
            .unwrap_or_else(|| InstrumentClass::from_analyzer(scan.analyzer))
    }
}

/// Insert zero-intensity samples across gaps wider than the sampling interval so that
/// the two sides of a gap do not merge into one peak
fn fill_gaps(mz_array: &[f64], intensity_array: &[f64], min_interval: f64) -> Vec<(f64, f64)> {
    let n = mz_array.len();
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        points.push((mz_array[i], intensity_array[i]));
        if i + 1 == n || min_interval <= 0.0 {
            continue;
        }
        let next = mz_array[i + 1];
        let mut gap = next - mz_array[i];
        let mut current = mz_array[i];
        let mut n_zeros = 0;
        while gap > 1.9 * min_interval {
            if n_zeros < 3 || current > next - 3.1 * min_interval {
                current += min_interval;
            } else {
                // snap to just before the next sample
                current = next - 3.0 * min_interval;
                gap = 4.0 * min_interval;
            }
            points.push((current, 0.0));
            gap -= min_interval;
            n_zeros += 1;
        }
    }
    points
}

/// Five point 1-4-6-4-1 smoothing, normalized by the weights that fit inside the series
fn smooth(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let mut weight = 6.0;
            let mut acc = 6.0 * points[i].1;
            if i >= 2 {
                weight += 1.0;
                acc += points[i - 2].1;
            }
            if i >= 1 {
                weight += 4.0;
                acc += 4.0 * points[i - 1].1;
            }
            if i + 1 < n {
                weight += 4.0;
                acc += 4.0 * points[i + 1].1;
            }
            if i + 2 < n {
                weight += 1.0;
                acc += points[i + 2].1;
            }
            (points[i].0, acc / weight)
        })
        .collect()
}

/// The Gaussian apex m/z estimated from the apex and its taller neighbor. Falls back to
/// the apex m/z when the correction leaves the span between the two samples.
pub fn gaussian_centroid(apex: (f64, f64), neighbor: (f64, f64), fwhm: f64) -> f64 {
    let spacing = apex.0 - neighbor.0;
    let delta = fwhm.powi(2) * (apex.1 / neighbor.1).ln() / (8.0 * LN_2 * spacing);
    if delta.abs() < (spacing / 2.0).abs() {
        delta + (apex.0 + neighbor.0) / 2.0
    } else {
        apex.0
    }
}

/**
Pick centroids from a profile spectrum.

The input must be sorted by m/z. Inputs with fewer than two samples, or without any local
maximum, produce empty outputs. Centroid intensity is the smoothed apex intensity.
*/
pub fn pick_peaks(
    mz_array: &[f64],
    intensity_array: &[f64],
    instrument_class: InstrumentClass,
    valid_mz_range: (f64, f64),
) -> Result<(Vec<f64>, Vec<f64>), SignalError> {
    if mz_array.len() != intensity_array.len() {
        return Err(SignalError::LengthMismatch {
            mz_len: mz_array.len(),
            intensity_len: intensity_array.len(),
        });
    }
    let n = mz_array.len();
    if n < 2 {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut min_interval = f64::INFINITY;
    for (i, w) in mz_array.windows(2).enumerate() {
        let interval = w[1] - w[0];
        if interval < 0.0 {
            return Err(SignalError::UnsortedMZ {
                index: i + 1,
                previous: w[0],
                current: w[1],
            });
        }
        min_interval = min_interval.min(interval);
    }
    let noise_floor = intensity_array
        .iter()
        .copied()
        .filter(|i| *i > 0.0)
        .fold(f64::INFINITY, f64::min);

    let smoothed = smooth(&fill_gaps(mz_array, intensity_array, min_interval));

    let mut centroid_mzs = Vec::new();
    let mut centroid_intensities = Vec::new();
    let mut ascending = false;
    for i in 0..smoothed.len() - 1 {
        if smoothed[i].1 < smoothed[i + 1].1 {
            ascending = true;
            continue;
        }
        if !ascending {
            continue;
        }
        ascending = false;

        // `ascending` implies i >= 1, and the loop bound implies i + 1 exists
        let apex = smoothed[i];
        let neighbor = if smoothed[i - 1].1 > smoothed[i + 1].1 {
            smoothed[i - 1]
        } else {
            smoothed[i + 1]
        };
        let mz = gaussian_centroid(apex, neighbor, instrument_class.fwhm(apex.0));
        let intensity = apex.1;

        if mz < valid_mz_range.0 || mz > valid_mz_range.1 || intensity < 0.99 * noise_floor {
            continue;
        }
        centroid_mzs.push(mz);
        centroid_intensities.push(intensity);
    }
    Ok((centroid_mzs, centroid_intensities))
}

/// Replace a profile scan's peaks with centroids, using the default valid m/z range
pub fn centroid(scan: &mut Scan, instrument_class: InstrumentClass) -> Result<(), SignalError> {
    centroid_in_range(scan, instrument_class, DEFAULT_VALID_MZ_RANGE)
}

/// Replace a profile scan's peaks with the centroids inside `valid_mz_range`.
///
/// The summary fields are not recomputed, see [`Scan::update_summaries`].
pub fn centroid_in_range(
    scan: &mut Scan,
    instrument_class: InstrumentClass,
    valid_mz_range: (f64, f64),
) -> Result<(), SignalError> {
    let (mzs, intensities) = pick_peaks(
        scan.mz_array(),
        scan.intensity_array(),
        instrument_class,
        valid_mz_range,
    )?;
    debug!(
        "Centroided scan {} from {} points to {} peaks",
        scan.scan_number,
        scan.len(),
        mzs.len()
    );
    scan.set_peaks(mzs, intensities)?;
    scan.is_centroided = true;
    Ok(())
}
