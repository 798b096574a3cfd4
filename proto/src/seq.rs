// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Sequence numbers for encrypted messages
//!
//! Each direction of a session carries an independent counter, starting at
//! `1` for the first encrypted message following the handshake.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   SEQUENCE_NUMBER (big endian)                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use crate::{Error, SEQ_LEN};

/// Per-direction message sequence number
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// Sequence number prior to the first message (no messages sent / received)
    pub const INITIAL: Self = Self(0);

    /// Create a sequence number from a raw value
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    /// Fetch the raw value
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Compute the following sequence number, `None` on exhaustion
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Encode to big-endian bytes (used as AEAD associated data)
    pub fn to_bytes(&self) -> [u8; SEQ_LEN] {
        let mut b = [0u8; SEQ_LEN];
        BigEndian::write_u32(&mut b, self.0);
        b
    }

    /// Decode from the first [SEQ_LEN] bytes of a message
    pub fn from_bytes(buff: &[u8]) -> Result<Self, Error> {
        if buff.len() < SEQ_LEN {
            return Err(Error::InvalidLength {
                expected: SEQ_LEN,
                actual: buff.len(),
            });
        }

        Ok(Self(BigEndian::read_u32(&buff[..SEQ_LEN])))
    }
}

impl core::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Encode for SequenceNumber {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(SEQ_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < SEQ_LEN {
            return Err(Error::InvalidLength {
                expected: SEQ_LEN,
                actual: buff.len(),
            });
        }

        BigEndian::write_u32(&mut buff[..SEQ_LEN], self.0);

        Ok(SEQ_LEN)
    }
}

impl DecodeOwned for SequenceNumber {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        Self::from_bytes(buff).map(|s| (s, SEQ_LEN))
    }
}
