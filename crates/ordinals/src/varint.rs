//! LEB128-style unsigned integers used by the runestone integer stream.
//!
//! Values are capped at 128 bits: the 19th byte may only carry the two
//! remaining high bits, and a 20th byte is never valid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of bytes a `u128` occupies on the wire.
pub const MAX_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Error {
    #[error("varint longer than {MAX_LEN} bytes")]
    Overlong,
    #[error("varint exceeds 128 bits")]
    Overflow,
    #[error("varint is missing its terminating byte")]
    Unterminated,
}

pub fn encode_to_vec(mut n: u128, v: &mut Vec<u8>) {
    while n >> 7 > 0 {
        v.push(n.to_le_bytes()[0] | 0b1000_0000);
        n >>= 7;
    }
    v.push(n.to_le_bytes()[0]);
}

pub fn encode(n: u128) -> Vec<u8> {
    let mut v = Vec::new();
    encode_to_vec(n, &mut v);
    v
}

/// Decodes one integer from the front of `buffer`, returning it together
/// with the number of bytes consumed.
pub fn decode(buffer: &[u8]) -> Result<(u128, usize), Error> {
    let mut n = 0u128;

    for (i, &byte) in buffer.iter().enumerate() {
        if i >= MAX_LEN {
            return Err(Error::Overlong);
        }

        let value = u128::from(byte) & 0b0111_1111;

        if i == MAX_LEN - 1 && value & 0b0111_1100 != 0 {
            return Err(Error::Overflow);
        }

        n |= value << (7 * i);

        if byte & 0b1000_0000 == 0 {
            return Ok((n, i + 1));
        }
    }

    Err(Error::Unterminated)
}
