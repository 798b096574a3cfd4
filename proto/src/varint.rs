// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Variable-length unsigned integers (7 bits per byte, least significant
//! group first, high bit set on all but the final byte)
//!
//! Used by the reflector to deliver the relay identifier.

use crate::Error;

/// Maximum encoded length of a 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint from the start of `buff`, returning the value and
/// number of bytes consumed
pub fn decode_varint(buff: &[u8]) -> Result<(u64, usize), Error> {
    let mut value = 0u64;

    for (i, b) in buff.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(Error::VarintOverflow(MAX_VARINT_LEN));
        }

        let group = (b & 0x7f) as u64;

        // The tenth byte may only contribute the single remaining bit
        if i == MAX_VARINT_LEN - 1 && (group > 1 || b & 0x80 != 0) {
            return Err(Error::VarintOverflow(MAX_VARINT_LEN));
        }

        value |= group << (7 * i);

        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(Error::VarintUnterminated)
}

/// Encode a varint into a new buffer
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut b = Vec::with_capacity(MAX_VARINT_LEN);

    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;

        if value == 0 {
            b.push(group);
            return b;
        }

        b.push(group | 0x80);
    }
}

/// Decode a varint length prefix followed by that many bytes,
/// returning the prefixed slice and total bytes consumed
pub fn decode_prefixed(buff: &[u8]) -> Result<(&[u8], usize), Error> {
    let (len, n) = decode_varint(buff)?;

    let end = usize::try_from(len)
        .ok()
        .and_then(|l| n.checked_add(l))
        .filter(|e| *e <= buff.len())
        .ok_or(Error::InvalidLength {
            expected: n.saturating_add(len as usize),
            actual: buff.len(),
        })?;

    Ok((&buff[n..end], end))
}
