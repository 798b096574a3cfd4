// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Encrypted channel
//!
//! Post-handshake messages are encrypted with AES-128-GCM under the session
//! key, using the sequence number as additional authenticated data:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   SEQUENCE NUMBER (BE, 4 bytes)               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                          IV (12 bytes)                        /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                    CIPHERTEXT (variable length)               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                          TAG (16 bytes)                       /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Nonce,
};
use hkdf::Hkdf;
use rand_core::{CryptoRngCore, OsRng};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use mwa_proto::{SequenceNumber, IV_LEN, PUBLIC_KEY_LEN, SEQ_LEN, TAG_LEN};

use crate::Error;

/// AES-128 key length
pub const KEY_LEN: usize = 16;

/// Minimum encrypted message length (empty plaintext)
pub const MIN_MESSAGE_LEN: usize = SEQ_LEN + IV_LEN + TAG_LEN;

/// Symmetric session key, lives for the session and is never serialised
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_LEN]);

impl SharedSecret {
    /// Derive a session key from an ECDH shared x-coordinate,
    /// salted with the association public key
    pub fn derive(ikm: &[u8], association_public: &[u8; PUBLIC_KEY_LEN]) -> Result<Self, Error> {
        let hk = Hkdf::<Sha256>::new(Some(association_public), ikm);

        let mut k = [0u8; KEY_LEN];
        hk.expand(&[], &mut k).map_err(|_| Error::KeyDerivation)?;

        Ok(Self(k))
    }

    /// Create a session key from raw bytes
    pub fn from_bytes(b: [u8; KEY_LEN]) -> Self {
        Self(b)
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SharedSecret(..)")
    }
}

/// Encrypt a message with the provided sequence number
pub fn encrypt_message(
    secret: &SharedSecret,
    seq: SequenceNumber,
    plaintext: &[u8],
    rng: &mut impl CryptoRngCore,
) -> Result<Vec<u8>, Error> {
    let cipher = Aes128Gcm::new_from_slice(&secret.0).map_err(|_| Error::EncryptFailed)?;

    let aad = seq.to_bytes();
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let ct = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| Error::EncryptFailed)?;

    let mut buff = Vec::with_capacity(SEQ_LEN + IV_LEN + ct.len());
    buff.extend_from_slice(&aad);
    buff.extend_from_slice(&iv);
    buff.extend_from_slice(&ct);

    Ok(buff)
}

/// Decrypt a message, returning the sequence number and plaintext
///
/// This does not check sequence ordering, see [SessionCipher::decrypt].
pub fn decrypt_message(
    secret: &SharedSecret,
    msg: &[u8],
) -> Result<(SequenceNumber, Vec<u8>), Error> {
    if msg.len() < MIN_MESSAGE_LEN {
        return Err(Error::MessageTooShort(msg.len()));
    }

    let seq = SequenceNumber::from_bytes(&msg[..SEQ_LEN])?;
    let iv = &msg[SEQ_LEN..][..IV_LEN];
    let ct = &msg[SEQ_LEN + IV_LEN..];

    let cipher = Aes128Gcm::new_from_slice(&secret.0).map_err(|_| Error::DecryptFailed)?;

    let pt = cipher
        .decrypt(
            Nonce::from_slice(iv),
            Payload {
                msg: ct,
                aad: &msg[..SEQ_LEN],
            },
        )
        .map_err(|_| Error::DecryptFailed)?;

    Ok((seq, pt))
}

/// Session cipher, owning the session key and both sequence counters
pub struct SessionCipher {
    secret: SharedSecret,
    outbound: SequenceNumber,
    inbound: SequenceNumber,
}

impl SessionCipher {
    /// Create a new cipher with both counters at zero
    /// (the first message in each direction carries sequence number 1)
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            outbound: SequenceNumber::INITIAL,
            inbound: SequenceNumber::INITIAL,
        }
    }

    /// Last sequence number sent
    pub fn outbound(&self) -> SequenceNumber {
        self.outbound
    }

    /// Last sequence number accepted
    pub fn inbound(&self) -> SequenceNumber {
        self.inbound
    }

    /// Encrypt the next outbound message
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let seq = self.outbound.next().ok_or(Error::SequenceOverflow)?;

        let msg = encrypt_message(&self.secret, seq, plaintext, &mut OsRng)?;
        self.outbound = seq;

        Ok(msg)
    }

    /// Decrypt the next inbound message, rejecting any message whose
    /// sequence number is not exactly one greater than the last accepted
    pub fn decrypt(&mut self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        if msg.len() < MIN_MESSAGE_LEN {
            return Err(Error::MessageTooShort(msg.len()));
        }

        let expected = self.inbound.next().ok_or(Error::SequenceOverflow)?;
        let actual = SequenceNumber::from_bytes(&msg[..SEQ_LEN])?;

        if actual != expected {
            #[cfg(feature = "log")]
            log::warn!("rejecting sequence {} (expected {})", actual, expected);

            return Err(Error::SequenceMismatch {
                expected: expected.value(),
                actual: actual.value(),
            });
        }

        let (_, pt) = decrypt_message(&self.secret, msg)?;
        self.inbound = expected;

        Ok(pt)
    }
}

impl core::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("outbound", &self.outbound)
            .field("inbound", &self.inbound)
            .finish()
    }
}
