//! Login phase: refuse immediately with the configured kick message.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use mc_facade_proto::error::ProtoError;
use mc_facade_proto::packets::{LoginDisconnect, LoginStart};

use super::{Connection, Phase};

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Read the LoginStart, answer with a single LoginDisconnect, close.
    /// No negotiation: the kick message is the whole conversation.
    pub(super) async fn serve_login(&mut self) -> Result<(), ProtoError> {
        let packet = self.read_frame_timed().await?;
        let login = LoginStart::decode(&packet)?;

        let disconnect =
            LoginDisconnect::new(&self.config.server.kick_message).into_packet()?;
        self.write_packet(disconnect).await?;
        info!(
            addr = %self.state.addr,
            username = %login.username,
            "login_refused"
        );
        self.state.advance(Phase::Closed);
        Ok(())
    }
}
