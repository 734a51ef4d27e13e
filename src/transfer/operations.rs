//! Transfer operations
//!
//! Negotiates the data channel for one transfer in passive (PASV) or active
//! (PORT) mode.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

use log::{debug, info};
use tokio::net::{TcpListener, TcpSocket};

use crate::control::ControlConnection;
use crate::error::{FtpError, NegotiationError};
use crate::protocol::FtpCommand;
use crate::transfer::data_channel::DataChannel;
use crate::transfer::modes::TransferMode;
use crate::transfer::results::{ActiveModeResult, PassiveModeResult};
use crate::utils::network::connect_with_timeout;

/// Backlog of the active-mode listener
const LISTEN_BACKLOG: u32 = 5;

/// Extracts `h1,h2,h3,h4,p1,p2` from the first parenthesized group of a
/// PASV reply.
pub fn parse_pasv_reply(text: &str) -> Result<SocketAddrV4, NegotiationError> {
    let malformed = || NegotiationError::MalformedAddress(text.to_string());

    let open = text.find('(').ok_or_else(malformed)?;
    let close = text[open + 1..]
        .find(')')
        .map(|offset| open + 1 + offset)
        .ok_or_else(malformed)?;

    let fields = text[open + 1..close]
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| malformed())?;

    let [h1, h2, h3, h4, p1, p2] = fields[..] else {
        return Err(malformed());
    };

    let port = u16::from(p1) * 256 + u16::from(p2);
    Ok(SocketAddrV4::new(Ipv4Addr::new(h1, h2, h3, h4), port))
}

/// Sets up passive mode: asks the server for an address and connects to it.
pub async fn setup_passive_mode(
    ctrl: &mut ControlConnection,
) -> Result<PassiveModeResult, FtpError> {
    let reply = ctrl.send_command(&FtpCommand::PASV).await?;
    if !reply.is_success() {
        return Err(NegotiationError::Refused(reply).into());
    }

    let data_addr = parse_pasv_reply(reply.text())?;
    debug!("Server advertised passive address {}", data_addr);

    let stream = connect_with_timeout(data_addr, ctrl.connect_timeout())
        .await
        .map_err(|e| NegotiationError::ConnectFailed(SocketAddr::V4(data_addr), e))?;

    info!("Passive data connection established to {}", data_addr);
    Ok(PassiveModeResult { data_addr, stream })
}

/// Sets up active mode: listens on an ephemeral port and announces it with
/// PORT, using the local address of the control connection.
pub async fn setup_active_mode(ctrl: &mut ControlConnection) -> Result<ActiveModeResult, FtpError> {
    // The interface the control connection actually leaves through, which is
    // the one the server can reach us on.
    let local_ip = match ctrl.local_addr().ip() {
        IpAddr::V4(ip) => ip,
        other => return Err(NegotiationError::UnsupportedAddress(other).into()),
    };

    let listener = bind_data_listener().map_err(NegotiationError::ListenFailed)?;
    let port = listener
        .local_addr()
        .map_err(NegotiationError::ListenFailed)?
        .port();
    let advertised = SocketAddrV4::new(local_ip, port);

    let reply = ctrl.send_command(&FtpCommand::PORT(advertised)).await?;
    if !reply.is_success() {
        return Err(NegotiationError::Refused(reply).into());
    }

    info!("Listening for active data connection on {}", advertised);
    Ok(ActiveModeResult {
        advertised,
        listener,
    })
}

/// Binds a listener to an ephemeral port on the wildcard address.
fn bind_data_listener() -> io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.listen(LISTEN_BACKLOG)
}

/// Negotiates a data channel with the given strategy.
pub async fn negotiate(
    ctrl: &mut ControlConnection,
    mode: TransferMode,
) -> Result<DataChannel, FtpError> {
    match mode {
        TransferMode::Passive => {
            let result = setup_passive_mode(ctrl).await?;
            Ok(DataChannel::Connected(result.stream))
        }
        TransferMode::Active => {
            let result = setup_active_mode(ctrl).await?;
            Ok(DataChannel::Listening {
                listener: result.listener,
                expected_peer: ctrl.peer_addr().ip(),
            })
        }
    }
}
