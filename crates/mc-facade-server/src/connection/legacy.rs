//! Legacy server-list ping: one unframed probe in, one unframed reply out.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::info;

use mc_facade_proto::error::ProtoError;
use mc_facade_proto::legacy;

use super::{Connection, Phase};

/// How long to wait for the rest of the probe. A 1.6 client appends a
/// plugin-message payload after the probe byte; everything it sends is
/// discarded either way, so the window only needs to outlast one flush.
const DRAIN_WINDOW: Duration = Duration::from_millis(250);

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The 0xFE probe byte has already been consumed by detection.
    pub(super) async fn serve_legacy(&mut self) -> Result<(), ProtoError> {
        self.drain_probe_payload().await;

        let response = legacy::build_response(
            &self.config.server.version_text,
            &self.config.server.motd,
            self.config.server.online_players,
            self.config.server.max_players,
        );
        self.stream.write_all(&response).await?;
        self.stream.flush().await?;
        info!(addr = %self.state.addr, "legacy_ping_served");
        self.state.advance(Phase::Closed);
        Ok(())
    }

    /// Discard whatever trails the probe byte. EOF ends the drain at once;
    /// a client that keeps the socket open is cut off by the window.
    async fn drain_probe_payload(&mut self) {
        let mut scratch = [0u8; 256];
        let _ = timeout(DRAIN_WINDOW, async {
            loop {
                match self.stream.read(&mut scratch).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
    }
}
