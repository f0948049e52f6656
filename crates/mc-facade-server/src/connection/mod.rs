//! Per-connection protocol handling.
//!
//! Each accepted connection gets one task running [`handle_connection`]:
//! sniff the first byte to tell the legacy probe from the modern framed
//! protocol, then walk the handshake state machine to a single status
//! exchange or login refusal, and close. Nothing here is shared between
//! connections except the read-only config.

mod legacy;
mod login;
mod status;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{info, warn};

use mc_facade_proto::error::ProtoError;
use mc_facade_proto::frame::RawPacket;
use mc_facade_proto::legacy::LEGACY_PROBE;
use mc_facade_proto::packets::{Handshake, NextState};
use mc_facade_proto::types::VarInt;

use crate::config::ServerConfig;

/// Protocol phase of one connection. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshake,
    Status,
    Login,
    Closed,
}

impl Phase {
    fn rank(self) -> u8 {
        match self {
            Phase::Handshake => 0,
            Phase::Status | Phase::Login => 1,
            Phase::Closed => 2,
        }
    }
}

/// Per-connection state. Created on accept, dropped on close, never shared.
#[derive(Debug)]
pub struct ConnectionState {
    pub phase: Phase,
    /// Whatever the client claimed in its handshake; echoed back, never
    /// validated against a supported list.
    pub protocol_version: i32,
    pub addr: SocketAddr,
}

impl ConnectionState {
    /// Phases are never revisited; a backwards transition is a bug in the
    /// state machine itself, not in client input.
    fn advance(&mut self, next: Phase) {
        debug_assert!(
            next.rank() > self.phase.rank(),
            "phase may only move forward ({:?} -> {next:?})",
            self.phase
        );
        self.phase = next;
    }
}

pub struct Connection<S> {
    stream: S,
    /// Byte consumed by protocol detection but not yet by framing.
    peeked: Option<u8>,
    config: Arc<ServerConfig>,
    state: ConnectionState,
}

/// Run one connection to completion. Errors are connection-local: they are
/// logged and the transport is closed, nothing propagates to the listener.
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, config: Arc<ServerConfig>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(%addr, "connection_opened");
    let mut conn = Connection::new(stream, addr, config);
    if let Err(err) = conn.run().await {
        warn!(%addr, kind = err.kind(), error = %err, "connection_error");
    }
    conn.close().await;
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, addr: SocketAddr, config: Arc<ServerConfig>) -> Self {
        Self {
            stream,
            peeked: None,
            config,
            state: ConnectionState {
                phase: Phase::Handshake,
                protocol_version: 0,
                addr,
            },
        }
    }

    /// Detect the protocol, then drive the connection through its single
    /// request cycle.
    pub async fn run(&mut self) -> Result<(), ProtoError> {
        let idle = self.config.limits.idle_timeout();
        let first = timeout(idle, self.read_u8())
            .await
            .map_err(|_| ProtoError::Timeout)??;

        if first == LEGACY_PROBE {
            return self.serve_legacy().await;
        }

        // The byte already read is the start of the frame length VarInt.
        self.peeked = Some(first);
        let packet = self.read_frame_timed().await?;
        let handshake = Handshake::decode(&packet)?;
        self.state.protocol_version = handshake.protocol_version;

        match handshake.next_state {
            NextState::Status => {
                self.state.advance(Phase::Status);
                self.serve_status().await
            }
            NextState::Login => {
                self.state.advance(Phase::Login);
                self.serve_login().await
            }
        }
    }

    async fn close(&mut self) {
        if self.state.phase != Phase::Closed {
            self.state.advance(Phase::Closed);
        }
        let _ = self.stream.shutdown().await;
    }

    // -- reading ----------------------------------------------------------

    async fn read_u8(&mut self) -> Result<u8, ProtoError> {
        if let Some(byte) = self.peeked.take() {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        match self.stream.read(&mut buf).await {
            Ok(0) => Err(ProtoError::TruncatedInput),
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(ProtoError::Transport(e)),
        }
    }

    /// Read a VarInt byte-at-a-time off the stream.
    async fn read_varint(&mut self) -> Result<i32, ProtoError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for i in 0..VarInt::MAX_BYTES {
            let byte = self.read_u8().await?;
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
            shift += 7;
            if i == VarInt::MAX_BYTES - 1 {
                return Err(ProtoError::MalformedVarInt);
            }
        }
        Err(ProtoError::TruncatedInput)
    }

    /// Read one framed packet: length VarInt, then exactly that many bytes.
    async fn read_frame(&mut self) -> Result<RawPacket, ProtoError> {
        let len = self.read_varint().await?;
        let len = usize::try_from(len).map_err(|_| ProtoError::MalformedVarInt)?;
        if len > self.config.limits.max_packet_bytes {
            return Err(ProtoError::PayloadTooLarge {
                size: len,
                limit: self.config.limits.max_packet_bytes,
            });
        }
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtoError::TruncatedInput
            } else {
                ProtoError::Transport(e)
            }
        })?;
        RawPacket::decode_payload(Bytes::from(payload))
    }

    /// Read a frame, bounded by the idle timeout. A connection that sends
    /// nothing within the window is cut off instead of holding resources.
    async fn read_frame_timed(&mut self) -> Result<RawPacket, ProtoError> {
        let idle = self.config.limits.idle_timeout();
        timeout(idle, self.read_frame())
            .await
            .map_err(|_| ProtoError::Timeout)?
    }

    // -- writing ----------------------------------------------------------

    async fn write_packet(&mut self, packet: RawPacket) -> Result<(), ProtoError> {
        let wire = packet.encode(self.config.limits.max_packet_bytes)?;
        self.stream.write_all(&wire).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsSection, LoggingSection, ServerSection};
    use bytes::{BufMut, BytesMut};
    use mc_facade_proto::codec::{read_string, write_string, ProtoEncode};
    use mc_facade_proto::frame::DEFAULT_MAX_PACKET_BYTES;
    use mc_facade_proto::packets::StatusPayload;
    use std::io::Cursor;
    use tokio::io::{duplex, DuplexStream};

    const KICK: &str = "You cannot join this server.\nPlease contact an admin.";

    fn test_config(icon: Option<Vec<u8>>) -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            server: ServerSection {
                address: "0.0.0.0".into(),
                port: 25565,
                motd: "§aHello\n§7Welcome!".into(),
                version_text: "Facade 1.20.4".into(),
                kick_message: KICK.into(),
                icon: String::new(),
                max_players: 10,
                online_players: 3,
            },
            logging: LoggingSection::default(),
            limits: LimitsSection::default(),
            icon_bytes: icon,
        })
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:54321".parse().unwrap()
    }

    fn handshake_frame(protocol: i32, next_state: i32) -> Bytes {
        let mut body = BytesMut::new();
        VarInt(protocol).proto_encode(&mut body);
        write_string(&mut body, "localhost");
        body.put_u16(25565);
        VarInt(next_state).proto_encode(&mut body);
        RawPacket::new(0x00, body.freeze())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap()
    }

    async fn read_client_frame(stream: &mut DuplexStream) -> RawPacket {
        let mut len: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = stream.read_u8().await.unwrap();
            len |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut payload = vec![0u8; len as usize];
        stream.read_exact(&mut payload).await.unwrap();
        RawPacket::decode_payload(Bytes::from(payload)).unwrap()
    }

    fn spawn_server(config: Arc<ServerConfig>) -> DuplexStream {
        let (client, server) = duplex(64 * 1024);
        tokio::spawn(handle_connection(server, peer(), config));
        client
    }

    #[tokio::test]
    async fn status_exchange_reports_configured_values() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let status_request = RawPacket::new(0x00, Bytes::new())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&status_request).await.unwrap();

        let response = read_client_frame(&mut client).await;
        assert_eq!(response.id, 0x00);
        let mut cursor = Cursor::new(&response.body[..]);
        let json = read_string(&mut cursor).unwrap();
        let payload: StatusPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.players.max, 10);
        assert_eq!(payload.players.online, 3);
        assert_eq!(payload.version.protocol, 765);
        assert_eq!(payload.version.name, "Facade 1.20.4");
        assert_eq!(payload.description.text, "§aHello\n§7Welcome!");
        assert!(payload.favicon.is_none());
    }

    #[tokio::test]
    async fn status_response_includes_favicon_when_icon_configured() {
        let icon = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        let mut client = spawn_server(test_config(Some(icon)));

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let status_request = RawPacket::new(0x00, Bytes::new())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&status_request).await.unwrap();

        let response = read_client_frame(&mut client).await;
        let mut cursor = Cursor::new(&response.body[..]);
        let json = read_string(&mut cursor).unwrap();
        let payload: StatusPayload = serde_json::from_str(&json).unwrap();
        let favicon = payload.favicon.unwrap();
        assert!(favicon.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn ping_pong_echoes_payload_and_closes() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let payload: i64 = 0x1122334455667788;
        let ping = RawPacket::new(0x01, Bytes::copy_from_slice(&payload.to_be_bytes()))
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&ping).await.unwrap();

        let pong = read_client_frame(&mut client).await;
        assert_eq!(pong.id, 0x01);
        assert_eq!(&pong.body[..], &payload.to_be_bytes());

        // Server closes after the pong; nothing further arrives.
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn full_status_then_ping_cycle() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let status_request = RawPacket::new(0x00, Bytes::new())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&status_request).await.unwrap();
        let _ = read_client_frame(&mut client).await;

        let ping = RawPacket::new(0x01, Bytes::copy_from_slice(&7i64.to_be_bytes()))
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&ping).await.unwrap();
        let pong = read_client_frame(&mut client).await;
        assert_eq!(&pong.body[..], &7i64.to_be_bytes());

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn second_status_request_closes_without_reply() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let status_request = RawPacket::new(0x00, Bytes::new())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&status_request).await.unwrap();
        let _ = read_client_frame(&mut client).await;

        client.write_all(&status_request).await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn login_is_refused_with_kick_message() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&handshake_frame(765, 2)).await.unwrap();
        let mut body = BytesMut::new();
        write_string(&mut body, "Alice");
        let login_start = RawPacket::new(0x00, body.freeze())
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&login_start).await.unwrap();

        let disconnect = read_client_frame(&mut client).await;
        assert_eq!(disconnect.id, 0x00);
        let mut cursor = Cursor::new(&disconnect.body[..]);
        let json = read_string(&mut cursor).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["text"], KICK);

        // Exactly one packet, then EOF.
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_next_state_closes_without_reply() {
        let config = test_config(None);
        let (mut client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), config);
            let result = conn.run().await;
            conn.close().await;
            result
        });

        client.write_all(&handshake_frame(765, 5)).await.unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), "invalid_handshake");

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn garbage_packet_in_status_phase_is_rejected() {
        let config = test_config(None);
        let (mut client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), config);
            conn.run().await
        });

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let bogus = RawPacket::new(0x42, Bytes::from_static(b"junk"))
            .encode(DEFAULT_MAX_PACKET_BYTES)
            .unwrap();
        client.write_all(&bogus).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), "unexpected_packet");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let config = test_config(None);
        let (client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), config);
            conn.run().await
        });

        // Never write anything; paused time fast-forwards past the window.
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), "timeout");
        drop(client);
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_without_followup_times_out() {
        let config = test_config(None);
        let (mut client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), config);
            conn.run().await
        });

        client.write_all(&handshake_frame(765, 1)).await.unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut config = test_config(None);
        Arc::get_mut(&mut config).unwrap().limits.max_packet_bytes = 64;
        let (mut client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), config);
            conn.run().await
        });

        let mut wire = BytesMut::new();
        VarInt(1000).proto_encode(&mut wire);
        client.write_all(&wire).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), "payload_too_large");
    }

    #[tokio::test]
    async fn legacy_probe_gets_nul_separated_response() {
        let mut client = spawn_server(test_config(None));

        client.write_all(&[LEGACY_PROBE]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8(response.clone()).unwrap();
        let fields: Vec<&str> = text.split('\0').collect();
        assert_eq!(
            fields,
            vec!["§1", "127", "Facade 1.20.4", "§aHello", "3", "10"]
        );
        // No length prefix: the reply starts with the § marker.
        assert_eq!(&response[..2], "§".as_bytes());
    }

    #[tokio::test]
    async fn legacy_probe_with_trailing_payload() {
        let mut client = spawn_server(test_config(None));

        // 1.4-style probe: 0xFE 0x01.
        client.write_all(&[LEGACY_PROBE, 0x01]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8(response).unwrap();
        assert!(text.starts_with("§1\0127\0"));
    }
}
