//! Minecraft Java Edition server-list protocol types and packet definitions.
//!
//! Covers exactly the slice of the protocol a status façade needs: the
//! handshake, the status exchange, the login refusal, and the legacy
//! (pre-netty) server-list ping.

pub mod codec;
pub mod error;
pub mod frame;
pub mod legacy;
pub mod packets;
pub mod types;
