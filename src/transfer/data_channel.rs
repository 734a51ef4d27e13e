//! Module `data_channel`
//!
//! One data connection instance per transfer command. Passive mode hands
//! over a stream that is already connected; active mode hands over the
//! listener and the connection is accepted once the server has acknowledged
//! the transfer command.

use std::net::IpAddr;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::error::TransferError;
use crate::transfer::modes::TransferMode;
use crate::utils::network::with_deadline;

/// A negotiated, not yet used data channel.
#[derive(Debug)]
pub enum DataChannel {
    /// Outbound connection to the address advertised by PASV.
    Connected(TcpStream),
    /// Local listener advertised by PORT, plus the server address we expect
    /// the connection from.
    Listening {
        listener: TcpListener,
        expected_peer: IpAddr,
    },
}

impl DataChannel {
    pub fn mode(&self) -> TransferMode {
        match self {
            DataChannel::Connected(_) => TransferMode::Passive,
            DataChannel::Listening { .. } => TransferMode::Active,
        }
    }

    /// Yields the connected data stream, accepting the server's connection
    /// in active mode. The listener is closed after the first accept.
    pub async fn establish(self, accept_timeout: Option<Duration>) -> Result<TcpStream, TransferError> {
        match self {
            DataChannel::Connected(stream) => {
                debug!("Passive data connection ready");
                Ok(stream)
            }
            DataChannel::Listening {
                listener,
                expected_peer,
            } => {
                let (stream, peer_addr) = with_deadline(accept_timeout, listener.accept())
                    .await
                    .map_err(TransferError::AcceptFailed)?;

                if peer_addr.ip() != expected_peer {
                    warn!(
                        "Data connection from {} does not match server address {}",
                        peer_addr, expected_peer
                    );
                }

                info!("Active data connection accepted from {}", peer_addr);
                Ok(stream)
            }
        }
    }
}
