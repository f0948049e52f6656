//! Packet definitions for the handshake, status, and login phases.

pub mod handshake;
pub mod login;
pub mod status;

pub use handshake::{Handshake, NextState};
pub use login::{LoginDisconnect, LoginStart};
pub use status::{
    ClientStatusPacket, PongResponse, StatusPayload, StatusResponse, FAVICON_PNG_PREFIX,
};

/// Protocol version advertised in the legacy ping response. Newer than any
/// client that still speaks the legacy format, so those clients render the
/// server as outdated instead of joinable.
pub const LEGACY_PROTOCOL_VERSION: i32 = 127;
