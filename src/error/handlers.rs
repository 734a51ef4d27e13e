//! Error handlers
//!
//! Decides which errors end the session and how they are reported.

use crate::error::types::{FtpError, ProtocolError};
use log::{error, warn};

/// Returns true when the control connection can no longer be trusted.
///
/// Stream faults and an unexpected close leave the reply stream in an unknown
/// state; everything else is recoverable at the command-dispatch boundary.
pub fn is_fatal(err: &FtpError) -> bool {
    matches!(
        err,
        FtpError::Stream(_) | FtpError::Protocol(ProtocolError::UnexpectedClose)
    )
}

/// Logs an error at the level matching its severity.
pub fn handle_error(err: &FtpError) {
    if is_fatal(err) {
        error!("FTP client error: {}", err);
    } else {
        warn!("Command failed: {}", err);
    }
}

/// Process exit status for an error that terminates the client.
pub fn exit_code(err: &FtpError) -> i32 {
    match err {
        FtpError::Config(_) => 2,
        FtpError::Stream(_) => 3,
        FtpError::Protocol(_) => 4,
        FtpError::Negotiation(_) | FtpError::Transfer(_) => 1,
    }
}
