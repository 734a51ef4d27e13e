//! Module `connection`
//!
//! Owns the control connection to the server and provides the single
//! request/response primitive every other operation is built on.

use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::error::{FtpError, ProtocolError, StreamError};
use crate::protocol::{self, FtpCommand, Reply, ReplyLimits, frame_command};
use crate::utils::network::{connect_with_timeout, write_fully};

/// The persistent command/reply connection of one session.
///
/// Commands are strictly one in flight: `send_command` takes `&mut self` and
/// returns only after the matching reply has been consumed.
pub struct ControlConnection {
    stream: BufReader<TcpStream>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    limits: ReplyLimits,
    max_command_length: usize,
    buffer_size: usize,
    connect_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    awaiting_final_reply: bool,
}

impl ControlConnection {
    /// Opens the control connection to `config.server_addr()`.
    ///
    /// The greeting is not read here; call `read_reply` next.
    pub async fn connect(config: &ClientConfig) -> Result<Self, FtpError> {
        let addr = config.server_addr();
        let stream = connect_with_timeout(addr.as_str(), config.connect_timeout())
            .await
            .map_err(StreamError::Io)?;
        info!("Connected to {}", addr);
        Self::from_stream(stream, config)
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, config: &ClientConfig) -> Result<Self, FtpError> {
        let local_addr = stream.local_addr().map_err(StreamError::Io)?;
        let peer_addr = stream.peer_addr().map_err(StreamError::Io)?;

        Ok(Self {
            stream: BufReader::new(stream),
            local_addr,
            peer_addr,
            limits: ReplyLimits {
                max_line_len: config.max_line_length,
                max_reply_len: config.max_reply_length,
                strict: config.strict_replies,
            },
            max_command_length: config.max_command_length,
            buffer_size: config.buffer_size,
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
            awaiting_final_reply: false,
        })
    }

    /// Sends one command and returns the server's reply.
    ///
    /// Any reply code is a normal result; only I/O and framing faults are
    /// errors. Rejected while a transfer's final reply is outstanding.
    pub async fn send_command(&mut self, command: &FtpCommand) -> Result<Reply, FtpError> {
        if self.awaiting_final_reply {
            return Err(ProtocolError::ReplyPending.into());
        }

        let framed = frame_command(command, self.max_command_length);
        debug!("--> {}", command.log_form());
        write_fully(self.stream.get_mut(), &framed)
            .await
            .map_err(StreamError::Io)?;

        self.receive_reply().await
    }

    /// Reads the next reply without sending anything, e.g. the greeting.
    ///
    /// Rejected while a transfer's final reply is outstanding; that reply
    /// belongs to `finish_transfer`.
    pub async fn read_reply(&mut self) -> Result<Reply, FtpError> {
        if self.awaiting_final_reply {
            return Err(ProtocolError::ReplyPending.into());
        }
        self.receive_reply().await
    }

    async fn receive_reply(&mut self) -> Result<Reply, FtpError> {
        let limits = self.limits;
        let reading = protocol::read_reply(&mut self.stream, &limits);
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, reading)
                .await
                .map_err(|_| StreamError::Timeout("waiting for a reply"))?,
            None => reading.await,
        }
    }

    /// Waits until reply bytes (or end-of-stream) are available without
    /// consuming any. Cancel safe.
    pub(crate) async fn wait_for_reply(&mut self) -> Result<(), FtpError> {
        self.stream.fill_buf().await.map_err(StreamError::Io)?;
        Ok(())
    }

    /// Reads a reply that arrives while a transfer is running, leaving the
    /// transfer pending.
    pub(crate) async fn read_interim_reply(&mut self) -> Result<Reply, FtpError> {
        self.receive_reply().await
    }

    /// Reads the reply that closes a transfer and releases the connection
    /// for new commands, whether or not the read succeeded.
    pub(crate) async fn read_final_reply(&mut self) -> Result<Reply, FtpError> {
        let result = self.receive_reply().await;
        self.awaiting_final_reply = false;
        result
    }

    pub(crate) fn set_awaiting_final_reply(&mut self, awaiting: bool) {
        self.awaiting_final_reply = awaiting;
    }

    /// Closes the write side of the connection.
    pub async fn shutdown(&mut self) -> Result<(), FtpError> {
        self.stream
            .get_mut()
            .shutdown()
            .await
            .map_err(StreamError::Io)?;
        info!("Control connection to {} closed", self.peer_addr);
        Ok(())
    }

    // --------------------
    // Getter methods
    // --------------------

    /// Local address of the control connection, used for PORT.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns whether a transfer's final reply has yet to be read.
    pub fn is_transfer_pending(&self) -> bool {
        self.awaiting_final_reply
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}
