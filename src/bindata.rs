//! Binary payload encoding: the base64 codec and the peak array encoder.
pub mod base64;
mod encoder;

pub use base64::Base64Error;
pub use encoder::{
    compress_zlib, pack_network_floats, unpack_network_floats, EncodedArray, EncodedPeakArrays,
    PeakArrayEncoder, PeakEncodingError, EMPTY_ARRAY_PLACEHOLDER,
};
