//! Modern-protocol packet framing.
//!
//! Every packet on the wire is `VarInt(len) ++ VarInt(id) ++ body`, where
//! `len` covers the id and the body but not itself. The legacy 0xFE probe
//! is the one thing on the port that is NOT framed this way; connections
//! are sorted out before this module ever sees their bytes.

use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::VarInt;

/// Default cap on the encoded id + body of a single packet.
pub const DEFAULT_MAX_PACKET_BYTES: usize = 1024 * 1024;

/// A logical packet: id plus undecoded body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub id: i32,
    pub body: Bytes,
}

impl RawPacket {
    pub fn new(id: i32, body: Bytes) -> Self {
        Self { id, body }
    }

    /// Parse a packet out of an already-length-delimited payload: the id
    /// VarInt sits at the front, everything after it is the body.
    pub fn decode_payload(payload: Bytes) -> Result<Self, ProtoError> {
        let mut cursor = Cursor::new(&payload[..]);
        let id = VarInt::proto_decode(&mut cursor)?.0;
        let body = payload.slice(cursor.position() as usize..);
        Ok(Self { id, body })
    }

    /// Serialize as `VarInt(len) ++ VarInt(id) ++ body`, rejecting packets
    /// whose id + body exceed `max_len`.
    pub fn encode(&self, max_len: usize) -> Result<Bytes, ProtoError> {
        let id = VarInt(self.id);
        let payload_len = id.encoded_len() + self.body.len();
        if payload_len > max_len {
            return Err(ProtoError::PayloadTooLarge {
                size: payload_len,
                limit: max_len,
            });
        }
        let mut out = BytesMut::with_capacity(VarInt::MAX_BYTES + payload_len);
        VarInt(payload_len as i32).proto_encode(&mut out);
        id.proto_encode(&mut out);
        out.put_slice(&self.body);
        Ok(out.freeze())
    }
}
