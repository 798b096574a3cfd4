// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Text encodings used on the wire
//!
//! - association tokens and reflector ids are base64url (unpadded)
//! - RPC payloads, addresses and signatures are standard base64
//! - base58 is provided for displaying addresses

use base64::prelude::{Engine as _, BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD};

use crate::Error;

/// Encode bytes as standard (padded) base64
pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    BASE64_STANDARD.encode(data)
}

/// Decode standard (padded) base64
pub fn b64_decode(s: &str) -> Result<Vec<u8>, Error> {
    BASE64_STANDARD
        .decode(s)
        .map_err(|e| Error::InvalidEncoding(e.to_string()))
}

/// Encode bytes as unpadded base64url
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url
pub fn b64url_decode(s: &str) -> Result<Vec<u8>, Error> {
    BASE64_URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| Error::InvalidEncoding(e.to_string()))
}

/// Encode bytes as base58
pub fn b58_encode(data: impl AsRef<[u8]>) -> String {
    bs58::encode(data).into_string()
}

/// Decode base58
pub fn b58_decode(s: &str) -> Result<Vec<u8>, Error> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| Error::InvalidEncoding(e.to_string()))
}

/// Decode a list of base64 payloads
pub fn b64_decode_all<S: AsRef<str>>(items: &[S]) -> Result<Vec<Vec<u8>>, Error> {
    items.iter().map(|s| b64_decode(s.as_ref())).collect()
}

/// Encode a list of payloads as base64
pub fn b64_encode_all<D: AsRef<[u8]>>(items: &[D]) -> Vec<String> {
    items.iter().map(b64_encode).collect()
}
