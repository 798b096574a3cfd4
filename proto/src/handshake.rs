// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Unencrypted handshake frames
//!
//! The dApp opens a session with a [HelloReq] carrying a fresh ephemeral
//! ECDH public key, signed by the association key advertised out-of-band.
//! The wallet replies with a [HelloRsp] carrying its own ephemeral public key
//! and (for protocol-versioned wallets) the encrypted session properties.

use encdec::{Decode, Encode};

use crate::{Error, PUBLIC_KEY_LEN, SIGNATURE_LEN};

/// dApp hello, sent once the socket is ready.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /              QD: EPHEMERAL_PUBLIC_KEY (65 bytes)              /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /           SA: ASSOCIATION_SIGNATURE OVER QD (64 bytes)        /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HelloReq {
    /// dApp ephemeral ECDH public key (uncompressed)
    pub public_key: [u8; PUBLIC_KEY_LEN],
    /// Association key signature over `public_key`
    pub signature: [u8; SIGNATURE_LEN],
}

impl HelloReq {
    /// Encoded length of a [HelloReq]
    pub const LEN: usize = PUBLIC_KEY_LEN + SIGNATURE_LEN;

    /// Encode into a new buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut b = vec![0u8; Self::LEN];
        b[..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        b[PUBLIC_KEY_LEN..].copy_from_slice(&self.signature);
        b
    }
}

impl Encode for HelloReq {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < Self::LEN {
            return Err(Error::InvalidLength {
                expected: Self::LEN,
                actual: buff.len(),
            });
        }

        buff[..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        buff[PUBLIC_KEY_LEN..Self::LEN].copy_from_slice(&self.signature);

        Ok(Self::LEN)
    }
}

impl<'a> Decode<'a> for HelloReq {
    type Output = Self;
    type Error = Error;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), Error> {
        // Hello requests are exact, trailing data is a protocol error
        if buff.len() != Self::LEN {
            return Err(Error::InvalidLength {
                expected: Self::LEN,
                actual: buff.len(),
            });
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&buff[..PUBLIC_KEY_LEN]);

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&buff[PUBLIC_KEY_LEN..]);

        Ok((
            Self {
                public_key,
                signature,
            },
            Self::LEN,
        ))
    }
}

/// Wallet hello response.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /              QW: EPHEMERAL_PUBLIC_KEY (65 bytes)              /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /           ENCRYPTED_SESSION_PROPERTIES (optional)             /
/// /                       (variable length)                       /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HelloRsp<'a> {
    /// Wallet ephemeral ECDH public key (uncompressed)
    pub public_key: [u8; PUBLIC_KEY_LEN],
    /// Encrypted session properties message
    pub session_properties: Option<&'a [u8]>,
}

impl<'a> HelloRsp<'a> {
    /// Encode into a new buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let props = self.session_properties.unwrap_or(&[]);

        let mut b = Vec::with_capacity(PUBLIC_KEY_LEN + props.len());
        b.extend_from_slice(&self.public_key);
        b.extend_from_slice(props);
        b
    }
}

impl<'a> Encode for HelloRsp<'a> {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(PUBLIC_KEY_LEN + self.session_properties.map(|p| p.len()).unwrap_or(0))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(Error::InvalidLength {
                expected: n,
                actual: buff.len(),
            });
        }

        buff[..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        if let Some(p) = self.session_properties {
            buff[PUBLIC_KEY_LEN..n].copy_from_slice(p);
        }

        Ok(n)
    }
}

impl<'a> Decode<'a> for HelloRsp<'a> {
    type Output = Self;
    type Error = Error;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), Error> {
        if buff.len() < PUBLIC_KEY_LEN {
            return Err(Error::InvalidLength {
                expected: PUBLIC_KEY_LEN,
                actual: buff.len(),
            });
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&buff[..PUBLIC_KEY_LEN]);

        let session_properties = match buff.len() > PUBLIC_KEY_LEN {
            true => Some(&buff[PUBLIC_KEY_LEN..]),
            false => None,
        };

        Ok((
            Self {
                public_key,
                session_properties,
            },
            buff.len(),
        ))
    }
}
