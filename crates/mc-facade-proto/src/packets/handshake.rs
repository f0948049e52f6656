//! Handshake (0x00) — Client → Server.
//!
//! The first framed packet on every modern connection; its `next_state`
//! field selects the phase the connection moves to.

use std::io::Cursor;

use bytes::Buf;

use crate::codec::{read_string, ProtoDecode};
use crate::error::ProtoError;
use crate::frame::RawPacket;
use crate::types::VarInt;

pub const HANDSHAKE_PACKET_ID: i32 = 0x00;

/// Phase requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

impl NextState {
    fn from_i32(v: i32) -> Result<Self, ProtoError> {
        match v {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            other => Err(ProtoError::InvalidHandshake(format!(
                "next_state {other} is not 1 (status) or 2 (login)"
            ))),
        }
    }
}

/// Handshake packet. The address and port are what the client typed into
/// its server list; they are read to keep the cursor honest and otherwise
/// ignored (no virtual-host routing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl Handshake {
    pub fn decode(packet: &RawPacket) -> Result<Self, ProtoError> {
        if packet.id != HANDSHAKE_PACKET_ID {
            return Err(ProtoError::InvalidHandshake(format!(
                "expected packet id 0x00, got 0x{:02X}",
                packet.id
            )));
        }
        let mut cursor = Cursor::new(&packet.body[..]);
        let protocol_version = VarInt::proto_decode(&mut cursor)?.0;
        let server_address = read_string(&mut cursor)?;
        if cursor.remaining() < 2 {
            return Err(ProtoError::TruncatedInput);
        }
        let server_port = cursor.get_u16();
        let next_state = NextState::from_i32(VarInt::proto_decode(&mut cursor)?.0)?;
        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}
