// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Session engine errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid (undecodable or off-curve) public key
    #[error("invalid public key")]
    InvalidKey,

    /// Hello signature did not verify against the association key
    #[error("invalid hello signature")]
    InvalidSignature,

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// Encrypted message shorter than header and tag
    #[error("encrypted message too short ({0} bytes)")]
    MessageTooShort(usize),

    /// Inbound sequence number did not follow the last accepted value
    #[error("sequence mismatch (expected {expected}, actual {actual})")]
    SequenceMismatch { expected: u32, actual: u32 },

    /// Sequence counter exhausted
    #[error("sequence number overflow")]
    SequenceOverflow,

    /// Encryption failed
    #[error("encryption failed")]
    EncryptFailed,

    /// Authentication / decryption failed
    #[error("decryption failed")]
    DecryptFailed,

    /// Frame received in a state that does not accept it
    #[error("unexpected frame in state {0}")]
    UnexpectedFrame(crate::handshake::HandshakeState),

    /// Event received in a state that does not accept it
    #[error("unexpected event in state {0}")]
    UnexpectedEvent(crate::handshake::HandshakeState),

    /// Socket closed before the handshake completed
    #[error("closed before connection")]
    ClosedBeforeConnection,

    /// No protocol version in common with the peer
    #[error("no common protocol version")]
    NoCommonVersion,

    /// Wire decoding failed
    #[error(transparent)]
    Proto(#[from] mwa_proto::Error),
}

impl Error {
    /// Protocol violations indicate a bug or tampering and are never retried
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Error::ClosedBeforeConnection)
    }
}
