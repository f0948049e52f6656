//! Legacy (pre-netty) server-list ping.
//!
//! Old clients probe with a bare 0xFE (possibly followed by a 0x01 and, for
//! 1.6, a plugin-message payload). None of it is length-prefixed, so the
//! probe byte has to be recognized before any VarInt framing is attempted.

use crate::packets::LEGACY_PROTOCOL_VERSION;

/// First byte of every legacy server-list ping.
pub const LEGACY_PROBE: u8 = 0xFE;

/// First line of a (possibly multi-line) MOTD. Legacy clients render a
/// single-line description only.
pub fn first_motd_line(motd: &str) -> &str {
    motd.lines().next().unwrap_or("")
}

/// Build the legacy ping response: `§1` followed by protocol number,
/// version text, MOTD line, online count, and max count, all NUL-separated
/// with no length prefix.
pub fn build_response(version_text: &str, motd: &str, online: u32, max: u32) -> Vec<u8> {
    let fields = [
        "§1".to_string(),
        LEGACY_PROTOCOL_VERSION.to_string(),
        version_text.to_string(),
        first_motd_line(motd).to_string(),
        online.to_string(),
        max.to_string(),
    ];
    let mut out = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(0);
        }
        out.extend_from_slice(field.as_bytes());
    }
    out
}
