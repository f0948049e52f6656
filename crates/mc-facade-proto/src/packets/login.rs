//! Login phase packets.
//!
//! Client → Server: LoginStart (0x00). Server → Client: LoginDisconnect
//! (0x00). This server never answers a LoginStart with anything but a
//! disconnect, so the rest of the login phase does not exist here.

use std::io::Cursor;

use bytes::BytesMut;
use serde::Serialize;

use crate::codec::{read_string, write_string};
use crate::error::ProtoError;
use crate::frame::RawPacket;

pub const LOGIN_START_ID: i32 = 0x00;
pub const LOGIN_DISCONNECT_ID: i32 = 0x00;

/// LoginStart. Vanilla clients append a UUID after the username; everything
/// past the name is irrelevant to a refusal and is left unread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
}

impl LoginStart {
    pub fn decode(packet: &RawPacket) -> Result<Self, ProtoError> {
        if packet.id != LOGIN_START_ID {
            return Err(ProtoError::UnexpectedPacket {
                phase: "login",
                id: packet.id,
            });
        }
        let mut cursor = Cursor::new(&packet.body[..]);
        let username = read_string(&mut cursor)?;
        Ok(Self { username })
    }
}

#[derive(Serialize)]
struct DisconnectReason<'a> {
    text: &'a str,
}

/// LoginDisconnect — a JSON chat component carrying the kick message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnect {
    pub reason: String,
}

impl LoginDisconnect {
    /// Multi-line kick messages are joined with the protocol's `\n` escape,
    /// which JSON string encoding produces on its own.
    pub fn new(kick_message: &str) -> Self {
        Self {
            reason: kick_message.to_string(),
        }
    }

    pub fn into_packet(self) -> Result<RawPacket, ProtoError> {
        let json = serde_json::to_string(&DisconnectReason { text: &self.reason })
            .map_err(std::io::Error::other)?;
        let mut body = BytesMut::new();
        write_string(&mut body, &json);
        Ok(RawPacket::new(LOGIN_DISCONNECT_ID, body.freeze()))
    }
}
