//! Standard-alphabet, `=`-padded base64, as used for peak payloads in both document formats.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Base64Error {
    #[error("A padded base64 string cannot have length {length}, it must be a multiple of 4")]
    MalformedInput { length: usize },
    #[error("The base64 string of length {length} contains invalid symbols or padding")]
    InvalidSymbol { length: usize },
}

/// Encode `bytes` as base64 text. Empty input yields an empty string.
pub fn encode<B: AsRef<[u8]>>(bytes: B) -> String {
    base64_simd::STANDARD.encode_type::<String>(bytes.as_ref())
}

/// Decode padded base64 `text` back into bytes
pub fn decode<S: AsRef<[u8]>>(text: S) -> Result<Vec<u8>, Base64Error> {
    let text = text.as_ref();
    let length = text.len();
    if length % 4 != 0 {
        return Err(Base64Error::MalformedInput { length });
    }
    base64_simd::STANDARD
        .decode_to_vec(text)
        .map_err(|_| Base64Error::InvalidSymbol { length })
}
