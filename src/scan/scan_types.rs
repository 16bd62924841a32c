use crate::signal::SignalError;

use super::scan_properties::*;

/// The precursor ion a tandem scan fragmented.
///
/// Only scans with an MS level of 2 or greater carry one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Precursor {
    /// The scan number of the scan the precursor was selected from, if known
    pub scan_number: Option<u64>,
    pub mz: f64,
    /// Whether `mz` came from an accurate source rather than the vendor filter line
    pub mz_is_accurate: bool,
    /// The less precise precursor m/z parsed from the vendor filter line, if any
    pub filter_line_mz: Option<f64>,
    /// The charge state, `None` when undetermined
    pub charge: Option<u32>,
    pub intensity: f64,
    pub collision_energy: f64,
}

impl Default for Precursor {
    fn default() -> Self {
        Self {
            scan_number: None,
            mz: 0.0,
            mz_is_accurate: false,
            filter_line_mz: None,
            charge: None,
            intensity: 0.0,
            collision_energy: 0.0,
        }
    }
}

impl Precursor {
    /// The scan number a document should reference for this precursor, clamped to the
    /// first scan when unknown
    pub fn scan_reference(&self) -> u64 {
        self.scan_number.filter(|n| *n >= 1).unwrap_or(1)
    }
}

/// How a scan relates to spectrum merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeState {
    #[default]
    NotMerged,
    /// This scan was merged into another scan
    Member { merged_scan_number: Option<u64> },
    /// This scan is the product of a merge and stands on its own
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanOrigin {
    pub parent_file_id: String,
    pub scan_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanCoordinate {
    pub name: CoordinateName,
    pub value: String,
}

/// A vendor-native address for a scan, as an ordered list of coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NativeScanRef {
    pub scheme: CoordinateScheme,
    pub coordinates: Vec<ScanCoordinate>,
}

impl NativeScanRef {
    pub fn new(scheme: CoordinateScheme) -> Self {
        Self {
            scheme,
            coordinates: Vec::new(),
        }
    }

    pub fn add_coordinate<V: ToString>(&mut self, name: CoordinateName, value: V) {
        self.coordinates.push(ScanCoordinate {
            name,
            value: value.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/**
One spectrometer acquisition event.

The m/z and intensity arrays are kept private so that they always have the same length.
Numeric fields that the source could not determine hold `-1.0`.
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scan {
    pub scan_number: u64,
    pub ms_level: u8,
    pub polarity: Polarity,
    pub analyzer: MassAnalyzer,
    pub ionization: Ionization,
    pub activation: ActivationMethod,
    pub scan_type: ScanType,
    /// The vendor filter line, when the source provides one
    pub filter_line: Option<String>,

    /// The m/z range the instrument was set to scan
    pub start_mz: f64,
    pub end_mz: f64,
    /// The m/z range actually observed in the peak arrays
    pub min_observed_mz: f64,
    pub max_observed_mz: f64,

    pub base_peak_mz: f64,
    pub base_peak_intensity: f64,
    pub total_ion_current: f64,

    /// In seconds
    pub retention_time: f64,
    /// In seconds
    pub injection_time: f64,

    pub is_centroided: bool,
    pub is_thresholded: bool,

    pub precursor: Option<Precursor>,
    pub merge: MergeState,
    pub scan_origins: Vec<ScanOrigin>,
    pub native_scan_ref: Option<NativeScanRef>,

    mz_array: Vec<f64>,
    intensity_array: Vec<f64>,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            scan_number: 0,
            ms_level: 1,
            polarity: Polarity::Unknown,
            analyzer: MassAnalyzer::Undefined,
            ionization: Ionization::Undefined,
            activation: ActivationMethod::Undefined,
            scan_type: ScanType::Undefined,
            filter_line: None,
            start_mz: -1.0,
            end_mz: -1.0,
            min_observed_mz: -1.0,
            max_observed_mz: -1.0,
            base_peak_mz: -1.0,
            base_peak_intensity: -1.0,
            total_ion_current: -1.0,
            retention_time: -1.0,
            injection_time: -1.0,
            is_centroided: false,
            is_thresholded: false,
            precursor: None,
            merge: MergeState::NotMerged,
            scan_origins: Vec::new(),
            native_scan_ref: None,
            mz_array: Vec::new(),
            intensity_array: Vec::new(),
        }
    }
}

impl Scan {
    pub fn new(scan_number: u64, ms_level: u8) -> Self {
        Self {
            scan_number,
            ms_level,
            ..Default::default()
        }
    }

    /// Replace the peak arrays, consuming `self`
    pub fn with_peaks(mut self, mz_array: Vec<f64>, intensity_array: Vec<f64>) -> Result<Self, SignalError> {
        self.set_peaks(mz_array, intensity_array)?;
        Ok(self)
    }

    /// Replace the peak arrays. The two arrays must have equal length.
    pub fn set_peaks(&mut self, mz_array: Vec<f64>, intensity_array: Vec<f64>) -> Result<(), SignalError> {
        if mz_array.len() != intensity_array.len() {
            return Err(SignalError::LengthMismatch {
                mz_len: mz_array.len(),
                intensity_len: intensity_array.len(),
            });
        }
        self.mz_array = mz_array;
        self.intensity_array = intensity_array;
        Ok(())
    }

    /// Move the peak arrays out of the scan, leaving it empty
    pub fn take_peaks(&mut self) -> (Vec<f64>, Vec<f64>) {
        (
            std::mem::take(&mut self.mz_array),
            std::mem::take(&mut self.intensity_array),
        )
    }

    pub fn mz_array(&self) -> &[f64] {
        &self.mz_array
    }

    pub fn intensity_array(&self) -> &[f64] {
        &self.intensity_array
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mz_array
            .iter()
            .copied()
            .zip(self.intensity_array.iter().copied())
    }

    /// The number of data points
    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    pub fn is_merge_result(&self) -> bool {
        matches!(self.merge, MergeState::Result)
    }

    /// Check that the m/z array never decreases
    pub fn check_sorted(&self) -> Result<(), SignalError> {
        match self
            .mz_array
            .windows(2)
            .position(|w| w[1] < w[0])
        {
            Some(i) => Err(SignalError::UnsortedMZ {
                index: i + 1,
                previous: self.mz_array[i],
                current: self.mz_array[i + 1],
            }),
            None => Ok(()),
        }
    }

    /// Recompute the base peak, total ion current and observed m/z range from the
    /// current peak arrays. An empty scan gets zeros.
    pub fn update_summaries(&mut self) {
        if self.is_empty() {
            self.base_peak_mz = 0.0;
            self.base_peak_intensity = 0.0;
            self.total_ion_current = 0.0;
            self.min_observed_mz = 0.0;
            self.max_observed_mz = 0.0;
            return;
        }
        let mut base_peak = (self.mz_array[0], self.intensity_array[0]);
        let mut tic = 0.0;
        for (mz, intensity) in self.peaks() {
            tic += intensity;
            if intensity > base_peak.1 {
                base_peak = (mz, intensity);
            }
        }
        self.base_peak_mz = base_peak.0;
        self.base_peak_intensity = base_peak.1;
        self.total_ion_current = tic;
        self.min_observed_mz = self.mz_array[0];
        self.max_observed_mz = self.mz_array[self.len() - 1];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_peak_length_invariant() {
        let scan = Scan::new(1, 1).with_peaks(vec![100.0, 200.0], vec![1.0]);
        assert!(matches!(
            scan,
            Err(SignalError::LengthMismatch {
                mz_len: 2,
                intensity_len: 1
            })
        ));
    }

    #[test]
    fn test_update_summaries() -> Result<(), SignalError> {
        let mut scan = Scan::new(1, 1).with_peaks(
            vec![100.0, 150.0, 200.0],
            vec![10.0, 40.0, 5.0],
        )?;
        assert_eq!(scan.base_peak_mz, -1.0);
        scan.update_summaries();
        assert_eq!(scan.base_peak_mz, 150.0);
        assert_eq!(scan.base_peak_intensity, 40.0);
        assert_eq!(scan.total_ion_current, 55.0);
        assert_eq!(scan.min_observed_mz, 100.0);
        assert_eq!(scan.max_observed_mz, 200.0);

        scan.take_peaks();
        scan.update_summaries();
        assert_eq!(scan.total_ion_current, 0.0);
        Ok(())
    }

    #[test]
    fn test_check_sorted() -> Result<(), SignalError> {
        let scan = Scan::new(1, 1).with_peaks(vec![100.0, 100.0, 99.5], vec![1.0, 2.0, 3.0])?;
        match scan.check_sorted() {
            Err(SignalError::UnsortedMZ { index, .. }) => assert_eq!(index, 2),
            other => panic!("Expected unsorted error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_precursor_reference() {
        let mut prec = Precursor::default();
        assert_eq!(prec.scan_reference(), 1);
        prec.scan_number = Some(0);
        assert_eq!(prec.scan_reference(), 1);
        prec.scan_number = Some(7);
        assert_eq!(prec.scan_reference(), 7);
    }
}
