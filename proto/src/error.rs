// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Protocol encoding / decoding errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Buffer too short for the object being decoded
    #[error("invalid length (expected {expected}, actual {actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// Variable-length integer ran past its byte budget
    #[error("varint overflow (more than {0} bytes)")]
    VarintOverflow(usize),

    /// Variable-length integer ended before its terminating byte
    #[error("varint unterminated")]
    VarintUnterminated,

    /// Invalid base64 / base58 encoding
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Malformed association URI
    #[error("invalid association uri: {0}")]
    InvalidUri(String),

    /// Association port outside the dynamic range
    #[error("association port {0} outside dynamic range")]
    InvalidPort(u16),

    /// Unknown protocol version
    #[error("unsupported protocol version '{0}'")]
    UnsupportedVersion(String),

    /// Unknown RPC method
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// Chain identifier with no legacy cluster equivalent
    #[error("unsupported chain '{0}'")]
    UnsupportedChain(String),

    /// Required field absent
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// Malformed JSON
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic codec error
    #[error("codec error")]
    Codec,
}

impl From<encdec::Error> for Error {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => Error::InvalidLength {
                expected: 0,
                actual: 0,
            },
            _ => Error::Codec,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUri(e.to_string())
    }
}
