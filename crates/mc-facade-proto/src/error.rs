//! Protocol-level errors.
//!
//! Every variant is connection-local: it terminates the offending
//! connection and nothing else.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("VarInt is malformed (no terminator within {max} bytes)", max = crate::types::VarInt::MAX_BYTES)]
    MalformedVarInt,

    #[error("input ended before a complete value was read")]
    TruncatedInput,

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),

    #[error("unexpected packet id 0x{id:02X} in {phase} phase")]
    UnexpectedPacket { phase: &'static str, id: i32 },

    #[error("payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("connection idle timeout")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl ProtoError {
    /// Stable short name for the `connection_error` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtoError::MalformedVarInt => "malformed_varint",
            ProtoError::TruncatedInput => "truncated_input",
            ProtoError::InvalidUtf8 => "invalid_utf8",
            ProtoError::InvalidHandshake(_) => "invalid_handshake",
            ProtoError::UnexpectedPacket { .. } => "unexpected_packet",
            ProtoError::PayloadTooLarge { .. } => "payload_too_large",
            ProtoError::Timeout => "timeout",
            ProtoError::Transport(_) => "transport_error",
        }
    }
}
