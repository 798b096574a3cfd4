// Copyright (c) 2022-2023 The MobileCoin Foundation

use mwa_proto::ProtocolVersion;

use crate::{cipher::SessionCipher, Error};

/// Established session, produced by a completed handshake
///
/// Owns the session key and sequence counters, ownership passes to the
/// transport once the handshake reaches `connected`.
#[derive(Debug)]
pub struct Session {
    cipher: SessionCipher,
    version: ProtocolVersion,
}

impl Session {
    pub(crate) fn new(cipher: SessionCipher, version: ProtocolVersion) -> Self {
        Self { cipher, version }
    }

    /// Negotiated protocol version, fixed for the session lifetime
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Encrypt an outbound message
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher.encrypt(plaintext)
    }

    /// Decrypt an inbound message
    pub fn decrypt(&mut self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher.decrypt(msg)
    }
}
