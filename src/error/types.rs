//! Error types
//!
//! Defines the error taxonomy of the FTP client: stream faults, protocol
//! faults, data channel negotiation failures and transfer failures.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::protocol::Reply;

/// I/O faults on the control or data socket
#[derive(Debug)]
pub enum StreamError {
    Io(io::Error),
    Timeout(&'static str),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "Stream I/O error: {}", e),
            StreamError::Timeout(op) => write!(f, "Timed out while {}", op),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<io::Error> for StreamError {
    fn from(error: io::Error) -> Self {
        StreamError::Io(error)
    }
}

/// Malformed or unexpectedly terminated reply streams
#[derive(Debug)]
pub enum ProtocolError {
    /// The server closed the control connection before a reply code was seen.
    UnexpectedClose,
    /// The reply text exceeded the configured capacity.
    Truncated { code: Option<u16>, text: String },
    /// A transfer's final reply has not been consumed yet.
    ReplyPending,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnexpectedClose => {
                write!(f, "Connection closed before a reply was received")
            }
            ProtocolError::Truncated { code, text } => match code {
                Some(code) => write!(f, "Reply {} truncated: {}", code, text.trim_end()),
                None => write!(f, "Reply truncated: {}", text.trim_end()),
            },
            ProtocolError::ReplyPending => {
                write!(f, "A transfer is still waiting for its final reply")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// PASV/PORT setup failures
#[derive(Debug)]
pub enum NegotiationError {
    Refused(Reply),
    MalformedAddress(String),
    ConnectFailed(SocketAddr, io::Error),
    ListenFailed(io::Error),
    UnsupportedAddress(IpAddr),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::Refused(reply) => {
                write!(f, "Data channel refused: {}", reply.text().trim_end())
            }
            NegotiationError::MalformedAddress(text) => {
                write!(f, "Malformed passive address: {}", text.trim_end())
            }
            NegotiationError::ConnectFailed(addr, e) => {
                write!(f, "Failed to connect data channel to {}: {}", addr, e)
            }
            NegotiationError::ListenFailed(e) => {
                write!(f, "Failed to open listening socket: {}", e)
            }
            NegotiationError::UnsupportedAddress(ip) => {
                write!(f, "Active mode requires an IPv4 control connection, got {}", ip)
            }
        }
    }
}

impl std::error::Error for NegotiationError {}

/// Local file and data phase failures
#[derive(Debug)]
pub enum TransferError {
    LocalFile { path: PathBuf, source: io::Error },
    DataIo(io::Error),
    AcceptFailed(io::Error),
    Refused(Reply),
    Busy,
    WorkerLost(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::LocalFile { path, source } => {
                write!(f, "Local file {}: {}", path.display(), source)
            }
            TransferError::DataIo(e) => write!(f, "Data connection error: {}", e),
            TransferError::AcceptFailed(e) => {
                write!(f, "Failed to accept data connection: {}", e)
            }
            TransferError::Refused(reply) => write!(f, "{}", reply.text().trim_end()),
            TransferError::Busy => write!(f, "Another transfer is already in progress"),
            TransferError::WorkerLost(msg) => write!(f, "Transfer task failed: {}", msg),
        }
    }
}

impl std::error::Error for TransferError {}

/// General FTP client error that encompasses all error types
#[derive(Debug)]
pub enum FtpError {
    Stream(StreamError),
    Protocol(ProtocolError),
    Negotiation(NegotiationError),
    Transfer(TransferError),
    Config(config::ConfigError),
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpError::Stream(e) => write!(f, "{}", e),
            FtpError::Protocol(e) => write!(f, "Protocol error: {}", e),
            FtpError::Negotiation(e) => write!(f, "{}", e),
            FtpError::Transfer(e) => write!(f, "{}", e),
            FtpError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for FtpError {}

impl From<StreamError> for FtpError {
    fn from(error: StreamError) -> Self {
        FtpError::Stream(error)
    }
}

impl From<ProtocolError> for FtpError {
    fn from(error: ProtocolError) -> Self {
        FtpError::Protocol(error)
    }
}

impl From<NegotiationError> for FtpError {
    fn from(error: NegotiationError) -> Self {
        FtpError::Negotiation(error)
    }
}

impl From<TransferError> for FtpError {
    fn from(error: TransferError) -> Self {
        FtpError::Transfer(error)
    }
}

impl From<config::ConfigError> for FtpError {
    fn from(error: config::ConfigError) -> Self {
        FtpError::Config(error)
    }
}

impl From<io::Error> for FtpError {
    fn from(error: io::Error) -> Self {
        FtpError::Stream(StreamError::Io(error))
    }
}

pub type Result<T> = std::result::Result<T, FtpError>;
