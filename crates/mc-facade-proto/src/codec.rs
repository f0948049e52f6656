//! Protocol encoding/decoding traits and helpers.

use bytes::{Buf, BufMut};

use crate::error::ProtoError;
use crate::types::VarInt;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Write a Java protocol string (VarInt byte length + UTF-8).
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

/// Read a Java protocol string (VarInt byte length + UTF-8).
pub fn read_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let len = VarInt::proto_decode(buf)?.0;
    let len = usize::try_from(len).map_err(|_| ProtoError::MalformedVarInt)?;
    if buf.remaining() < len {
        return Err(ProtoError::TruncatedInput);
    }
    let data = buf.copy_to_bytes(len);
    String::from_utf8(data.to_vec()).map_err(|_| ProtoError::InvalidUtf8)
}
