//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use std::net::SocketAddrV4;

use tokio::net::{TcpListener, TcpStream};

use crate::error::TransferError;
use crate::protocol::Reply;
use crate::transfer::executor::Direction;

/// Result of setting up passive mode
#[derive(Debug)]
pub struct PassiveModeResult {
    pub data_addr: SocketAddrV4,
    pub stream: TcpStream,
}

/// Result of setting up active mode (PORT command)
#[derive(Debug)]
pub struct ActiveModeResult {
    pub advertised: SocketAddrV4,
    pub listener: TcpListener,
}

/// Outcome of one finished transfer
#[derive(Debug)]
pub struct TransferReport {
    pub direction: Direction,
    pub bytes: u64,
    pub preliminary: Reply,
    pub final_reply: Reply,
    /// Set when the data phase failed; the final reply was still consumed.
    pub data_error: Option<TransferError>,
}

impl TransferReport {
    /// True when the data phase succeeded and the server confirmed it.
    pub fn is_success(&self) -> bool {
        self.data_error.is_none() && self.final_reply.is_success()
    }
}
