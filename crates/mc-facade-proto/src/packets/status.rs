//! Status phase packets and the status JSON payload.
//!
//! Client → Server: StatusRequest (0x00), PingRequest (0x01).
//! Server → Client: StatusResponse (0x00), PongResponse (0x01).

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::codec::write_string;
use crate::error::ProtoError;
use crate::frame::RawPacket;
use crate::types::VarInt;

pub const STATUS_RESPONSE_ID: i32 = 0x00;
pub const PONG_RESPONSE_ID: i32 = 0x01;

pub const FAVICON_PNG_PREFIX: &str = "data:image/png;base64,";

/// Serverbound status-phase packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatusPacket {
    StatusRequest,
    PingRequest { payload: i64 },
}

impl ClientStatusPacket {
    pub fn decode(packet: &RawPacket) -> Result<Self, ProtoError> {
        match packet.id {
            0x00 => Ok(Self::StatusRequest),
            0x01 => {
                let mut cursor = Cursor::new(&packet.body[..]);
                if cursor.remaining() < 8 {
                    return Err(ProtoError::TruncatedInput);
                }
                Ok(Self::PingRequest {
                    payload: cursor.get_i64(),
                })
            }
            id => Err(ProtoError::UnexpectedPacket { phase: "status", id }),
        }
    }
}

/// StatusResponse (0x00) — the JSON status document as a protocol string.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub json: String,
}

impl StatusResponse {
    pub fn into_packet(self) -> RawPacket {
        let mut body = BytesMut::new();
        write_string(&mut body, &self.json);
        RawPacket::new(STATUS_RESPONSE_ID, body.freeze())
    }
}

/// PongResponse (0x01) — echoes the ping payload bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongResponse {
    pub payload: i64,
}

impl PongResponse {
    pub fn into_packet(self) -> RawPacket {
        RawPacket::new(
            PONG_RESPONSE_ID,
            Bytes::copy_from_slice(&self.payload.to_be_bytes()),
        )
    }
}

// ---------------------------------------------------------------------------
// Status JSON payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusPlayers {
    pub max: u32,
    pub online: u32,
    pub sample: Vec<StatusPlayerSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusPlayerSample {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusDescription {
    pub text: String,
}

/// The JSON document sent in a StatusResponse. Assembled fresh per request;
/// `version.protocol` echoes whatever the client sent in its handshake so
/// no client ever sees a version mismatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusPayload {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: StatusDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl StatusPayload {
    /// Build the payload from configured values. `icon` is raw PNG bytes;
    /// when present it becomes a `data:image/png;base64,` URI.
    pub fn build(
        version_name: &str,
        protocol: i32,
        max_players: u32,
        online_players: u32,
        motd: &str,
        icon: Option<&[u8]>,
    ) -> Self {
        Self {
            version: StatusVersion {
                name: version_name.to_string(),
                protocol,
            },
            players: StatusPlayers {
                max: max_players,
                online: online_players,
                sample: Vec::new(),
            },
            description: StatusDescription {
                text: motd.to_string(),
            },
            favicon: icon.map(|bytes| format!("{FAVICON_PNG_PREFIX}{}", BASE64.encode(bytes))),
        }
    }

    /// Serialize and wrap in a StatusResponse packet, enforcing `max_len`.
    pub fn into_response(self, max_len: usize) -> Result<RawPacket, ProtoError> {
        let json = serde_json::to_string(&self).map_err(std::io::Error::other)?;
        let packet = StatusResponse { json }.into_packet();
        // Same quantity the frame-length cap is measured against: id + body.
        let len = packet.body.len() + VarInt(packet.id).encoded_len();
        if len > max_len {
            return Err(ProtoError::PayloadTooLarge {
                size: len,
                limit: max_len,
            });
        }
        Ok(packet)
    }
}
