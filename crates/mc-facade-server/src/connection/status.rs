//! Status phase: answer one status request and/or one ping, then close.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use mc_facade_proto::error::ProtoError;
use mc_facade_proto::packets::{ClientStatusPacket, PongResponse, StatusPayload};

use super::{Connection, Phase};

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// One status cycle: an optional StatusRequest (answered exactly once),
    /// then an optional PingRequest that ends the connection. A client that
    /// only pings is a latency probe and is served too.
    pub(super) async fn serve_status(&mut self) -> Result<(), ProtoError> {
        let mut status_served = false;
        loop {
            let packet = self.read_frame_timed().await?;
            match ClientStatusPacket::decode(&packet)? {
                ClientStatusPacket::StatusRequest if !status_served => {
                    let response = self.build_status_payload().into_response(
                        self.config.limits.max_packet_bytes,
                    )?;
                    self.write_packet(response).await?;
                    info!(
                        addr = %self.state.addr,
                        protocol_version = self.state.protocol_version,
                        "status_served"
                    );
                    status_served = true;
                }
                ClientStatusPacket::StatusRequest => {
                    return Err(ProtoError::UnexpectedPacket {
                        phase: "status",
                        id: packet.id,
                    });
                }
                ClientStatusPacket::PingRequest { payload } => {
                    self.write_packet(PongResponse { payload }.into_packet())
                        .await?;
                    info!(
                        addr = %self.state.addr,
                        latency_payload = payload,
                        "ping_served"
                    );
                    self.state.advance(Phase::Closed);
                    return Ok(());
                }
            }
        }
    }

    /// Assemble the status document from config, echoing the client's
    /// protocol version. ServerConfig never changes after load, so this is
    /// effectively constant; it is still built per request because it is
    /// cheap and keeps the handler stateless.
    fn build_status_payload(&self) -> StatusPayload {
        StatusPayload::build(
            &self.config.server.version_text,
            self.state.protocol_version,
            self.config.server.max_players,
            self.config.server.online_players,
            &self.config.server.motd,
            self.config.icon_bytes.as_deref(),
        )
    }
}
