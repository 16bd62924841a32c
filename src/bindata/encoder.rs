use std::io::{self, prelude::*};

use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use log::debug;
use num_traits::AsPrimitive;
use thiserror::Error;

use super::base64::{self, Base64Error};
use crate::scan::Scan;

/// The encoding of eight zero bytes, written in place of an empty payload since
/// some readers reject zero-length binary elements
pub const EMPTY_ARRAY_PLACEHOLDER: &str = "AAAAAAAAAAA=";

const EMPTY_ARRAY_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum PeakEncodingError {
    #[error("An error occurred while compressing a peak array: {0}")]
    Compression(#[source] io::Error),
    #[error("An error occurred while decompressing a peak array: {0}")]
    Decompression(#[source] io::Error),
    #[error(transparent)]
    Base64(#[from] Base64Error),
    #[error("A buffer of {0} bytes does not hold whole 32-bit values")]
    TruncatedBuffer(usize),
    #[error("The m/z array has {mz_len} values but the intensity array has {intensity_len}")]
    LengthMismatch { mz_len: usize, intensity_len: usize },
}

/// One base64-encoded array of network-order 32-bit floats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArray {
    /// The number of values in the array
    pub array_length: usize,
    /// The size of the packed floats before compression
    pub byte_length: usize,
    pub compressed: bool,
    /// The size of the compressed buffer, zero when `compressed` is false
    pub compressed_length: usize,
    pub text: String,
}

impl EncodedArray {
    fn placeholder() -> Self {
        Self {
            array_length: 0,
            byte_length: EMPTY_ARRAY_BYTES,
            compressed: false,
            compressed_length: 0,
            text: EMPTY_ARRAY_PLACEHOLDER.to_string(),
        }
    }

    /// The length of the base64 text
    pub fn encoded_length(&self) -> usize {
        self.text.len()
    }

    /// Reverse the encoding, yielding the stored 32-bit values
    pub fn decode_values(&self) -> Result<Vec<f32>, PeakEncodingError> {
        let bytes = base64::decode(&self.text)?;
        let bytes = if self.compressed {
            let mut decoder = ZlibDecoder::new(Vec::with_capacity(self.byte_length));
            decoder
                .write_all(&bytes)
                .map_err(PeakEncodingError::Decompression)?;
            decoder.finish().map_err(PeakEncodingError::Decompression)?
        } else {
            bytes
        };
        unpack_network_floats(&bytes)
    }
}

/// The three encodings a document may need for a scan's peaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPeakArrays {
    pub mz: EncodedArray,
    pub intensity: EncodedArray,
    /// m/z and intensity interleaved as pairs
    pub pairs: EncodedArray,
}

/// Pack values as 32-bit big-endian floats
pub fn pack_network_floats<T: AsPrimitive<f32>, I: IntoIterator<Item = T>>(values: I) -> Vec<u8> {
    let words: Vec<u32> = values
        .into_iter()
        .map(|v| v.as_().to_bits().to_be())
        .collect();
    bytemuck::cast_slice::<u32, u8>(&words).to_vec()
}

pub fn unpack_network_floats(bytes: &[u8]) -> Result<Vec<f32>, PeakEncodingError> {
    if bytes.len() % 4 != 0 {
        return Err(PeakEncodingError::TruncatedBuffer(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn compress_zlib(bytestring: &[u8]) -> io::Result<Vec<u8>> {
    let mut compressor = ZlibEncoder::new(Vec::new(), Compression::default());
    compressor.write_all(bytestring)?;
    compressor.finish()
}

/**
Converts peak arrays into the binary payloads of a document.

Every value is cast to `f32` and written in network byte order. When `compress` is set,
each buffer is deflated and the compressed form is kept only when it is strictly smaller
than the raw bytes.
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakArrayEncoder {
    pub compress: bool,
}

impl PeakArrayEncoder {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    pub fn encode_scan(&self, scan: &Scan) -> Result<EncodedPeakArrays, PeakEncodingError> {
        self.encode_arrays(scan.mz_array(), scan.intensity_array())
    }

    /// Encode parallel arrays, which must have the same length
    pub fn encode_arrays<T: AsPrimitive<f32>>(
        &self,
        mz_array: &[T],
        intensity_array: &[T],
    ) -> Result<EncodedPeakArrays, PeakEncodingError> {
        if mz_array.len() != intensity_array.len() {
            return Err(PeakEncodingError::LengthMismatch {
                mz_len: mz_array.len(),
                intensity_len: intensity_array.len(),
            });
        }
        let n = mz_array.len();
        if n == 0 {
            return Ok(EncodedPeakArrays {
                mz: EncodedArray::placeholder(),
                intensity: EncodedArray::placeholder(),
                pairs: EncodedArray::placeholder(),
            });
        }

        let mz = self.encode_bytes(n, pack_network_floats(mz_array.iter().copied()))?;
        let intensity = self.encode_bytes(n, pack_network_floats(intensity_array.iter().copied()))?;
        let pairs = self.encode_bytes(
            n,
            pack_network_floats(
                mz_array
                    .iter()
                    .zip(intensity_array.iter())
                    .flat_map(|(mz, inten)| [*mz, *inten]),
            ),
        )?;
        Ok(EncodedPeakArrays {
            mz,
            intensity,
            pairs,
        })
    }

    fn encode_bytes(&self, array_length: usize, raw: Vec<u8>) -> Result<EncodedArray, PeakEncodingError> {
        let byte_length = raw.len();
        if self.compress {
            let compressed = compress_zlib(&raw).map_err(PeakEncodingError::Compression)?;
            if compressed.len() < byte_length {
                return Ok(EncodedArray {
                    array_length,
                    byte_length,
                    compressed: true,
                    compressed_length: compressed.len(),
                    text: base64::encode(&compressed),
                });
            }
            debug!(
                "Compression would not shrink a {byte_length} byte array ({} bytes), storing raw",
                compressed.len()
            );
        }
        Ok(EncodedArray {
            array_length,
            byte_length,
            compressed: false,
            compressed_length: 0,
            text: base64::encode(&raw),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn profile(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mz: Vec<f64> = (0..n).map(|i| 400.0 + i as f64 * 0.01).collect();
        let intensity: Vec<f64> = (0..n).map(|i| ((i % 50) as f64) * 10.0).collect();
        (mz, intensity)
    }

    #[test]
    fn test_network_order() {
        let bytes = pack_network_floats([1.0f64]);
        assert_eq!(bytes, vec![0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(unpack_network_floats(&bytes).unwrap(), vec![1.0f32]);
        assert!(matches!(
            unpack_network_floats(&bytes[..3]),
            Err(PeakEncodingError::TruncatedBuffer(3))
        ));
    }

    #[test]
    fn test_empty_placeholder() -> Result<(), PeakEncodingError> {
        for compress in [true, false] {
            let encoded = PeakArrayEncoder::new(compress).encode_arrays::<f64>(&[], &[])?;
            for arr in [&encoded.mz, &encoded.intensity, &encoded.pairs] {
                assert_eq!(arr.text, EMPTY_ARRAY_PLACEHOLDER);
                assert_eq!(arr.encoded_length(), 12);
                assert_eq!(arr.array_length, 0);
                assert!(!arr.compressed);
            }
        }
        Ok(())
    }

    #[test]
    fn test_unequal_lengths_rejected() {
        for compress in [true, false] {
            let encoder = PeakArrayEncoder::new(compress);
            assert!(matches!(
                encoder.encode_arrays(&[100.0f64, 200.0], &[5.0]),
                Err(PeakEncodingError::LengthMismatch {
                    mz_len: 2,
                    intensity_len: 1
                })
            ));
            assert!(matches!(
                encoder.encode_arrays::<f64>(&[], &[5.0]),
                Err(PeakEncodingError::LengthMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_round_trip_compressed() -> Result<(), PeakEncodingError> {
        let (mz, intensity) = profile(2000);
        let encoded = PeakArrayEncoder::new(true).encode_arrays(&mz, &intensity)?;
        assert!(encoded.intensity.compressed);
        assert_eq!(encoded.mz.array_length, 2000);
        assert_eq!(encoded.pairs.byte_length, 2000 * 8);

        let mz_back = encoded.mz.decode_values()?;
        let int_back = encoded.intensity.decode_values()?;
        let pairs_back = encoded.pairs.decode_values()?;
        for i in 0..mz.len() {
            assert_eq!(mz_back[i], mz[i] as f32);
            assert_eq!(int_back[i], intensity[i] as f32);
            assert_eq!(pairs_back[2 * i], mz[i] as f32);
            assert_eq!(pairs_back[2 * i + 1], intensity[i] as f32);
        }
        Ok(())
    }

    #[test]
    fn test_never_inflates() -> Result<(), PeakEncodingError> {
        // A single pair does not shrink under deflate
        let encoded = PeakArrayEncoder::new(true).encode_arrays(&[445.12f64], &[1.5e4])?;
        for arr in [&encoded.mz, &encoded.intensity, &encoded.pairs] {
            assert!(!arr.compressed);
            assert_eq!(arr.compressed_length, 0);
            assert_eq!(base64::decode(&arr.text)?.len(), arr.byte_length);
        }

        let (mz, intensity) = profile(500);
        let encoded = PeakArrayEncoder::new(true).encode_arrays(&mz, &intensity)?;
        for arr in [&encoded.mz, &encoded.intensity, &encoded.pairs] {
            let raw_len = arr.byte_length;
            let deflated = compress_zlib(&pack_network_floats(arr.decode_values()?))
                .map_err(PeakEncodingError::Compression)?
                .len();
            assert_eq!(arr.compressed, deflated < raw_len);
            if arr.compressed {
                assert_eq!(arr.compressed_length, deflated);
            }
        }
        Ok(())
    }

    #[test]
    fn test_uncompressed_is_raw() -> Result<(), PeakEncodingError> {
        let (mz, intensity) = profile(10);
        let encoded = PeakArrayEncoder::new(false).encode_arrays(&mz, &intensity)?;
        assert!(!encoded.pairs.compressed);
        assert_eq!(
            base64::decode(&encoded.mz.text)?,
            pack_network_floats(mz.iter().copied())
        );
        Ok(())
    }
}
