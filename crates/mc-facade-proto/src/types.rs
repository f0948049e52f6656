//! Base wire types for the Java Edition protocol.

use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

// ---------------------------------------------------------------------------
// VarInt (i32 — plain LEB128, NO ZigZag)
// ---------------------------------------------------------------------------

/// Variable-length i32: 7 data bits per byte, least-significant group first,
/// high bit set while more bytes follow. Java Edition does not ZigZag, so
/// negative values always occupy the full 5 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarInt(pub i32);

impl VarInt {
    /// Maximum bytes a VarInt can occupy.
    pub const MAX_BYTES: usize = 5;

    /// Encode into the provided buffer and return the number of bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let mut value = self.0 as u32;
        let mut written = 0;
        loop {
            if value & !0x7F == 0 {
                buf.push(value as u8);
                written += 1;
                return written;
            }
            buf.push((value & 0x7F | 0x80) as u8);
            value >>= 7;
            written += 1;
        }
    }

    /// Decode from a byte slice. Returns the value and the number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), ProtoError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for (i, &byte) in buf.iter().enumerate() {
            if i >= Self::MAX_BYTES {
                return Err(ProtoError::MalformedVarInt);
            }
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok((VarInt(result as i32), i + 1));
            }
            shift += 7;
        }
        if buf.len() >= Self::MAX_BYTES {
            return Err(ProtoError::MalformedVarInt);
        }
        Err(ProtoError::TruncatedInput)
    }

    /// Number of bytes `encode` would write.
    pub fn encoded_len(&self) -> usize {
        let mut value = self.0 as u32;
        let mut len = 1;
        while value & !0x7F != 0 {
            value >>= 7;
            len += 1;
        }
        len
    }
}

impl ProtoEncode for VarInt {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let mut value = self.0 as u32;
        loop {
            if value & !0x7F == 0 {
                buf.put_u8(value as u8);
                return;
            }
            buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }
}

impl ProtoDecode for VarInt {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for i in 0..Self::MAX_BYTES {
            if !buf.has_remaining() {
                return Err(ProtoError::TruncatedInput);
            }
            let byte = buf.get_u8();
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(VarInt(result as i32));
            }
            shift += 7;
            if i == Self::MAX_BYTES - 1 {
                return Err(ProtoError::MalformedVarInt);
            }
        }
        Err(ProtoError::TruncatedInput)
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        VarInt(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarInt({})", self.0)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
