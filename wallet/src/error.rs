// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Wallet side error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session transport failure
    #[error("transport error: {0}")]
    Transport(#[from] mwa::Error),

    /// Protocol violation (handshake, sequence, or crypto failure)
    #[error("protocol violation: {0}")]
    Protocol(#[from] mwa_core::Error),

    /// Wire decoding failure
    #[error("encoding error: {0}")]
    Encoding(#[from] mwa_proto::Error),

    /// Association URI does not describe a local association
    #[error("not a local association")]
    NotLocal,

    /// Socket closed before the handshake completed
    #[error("closed before connection")]
    ClosedBeforeConnection,

    /// Empty frame received after connection
    #[error("unexpected empty frame")]
    EmptyFrame,

    /// Local I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
