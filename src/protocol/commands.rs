//! Module `commands`
//!
//! Defines the FTP control commands the client sends and their wire framing.

use std::fmt;
use std::net::SocketAddrV4;

use log::warn;

/// Line terminator required after every control command.
pub const TERMINATOR: &str = "\r\n";

/// Represents an FTP command sent to the server.
///
/// Commands that take an argument store it in the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FtpCommand {
    USER(String), // Username for login
    PASS(String), // Password for login
    TYPE(String), // Representation type, "I" for binary
    CWD(String),  // Change working directory
    PWD,
    MKD(String),  // Make directory
    DELE(String), // Delete file
    PASV,         // Ask the server to listen for the data connection
    PORT(SocketAddrV4), // Tell the server where the client listens
    LIST,
    RETR(String), // Retrieve/download file
    STOR(String), // Store/upload file
    NOOP,
    QUIT,
}

impl FtpCommand {
    /// Command text suitable for logs, with the password masked.
    pub fn log_form(&self) -> String {
        match self {
            FtpCommand::PASS(_) => "PASS ****".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpCommand::USER(name) => write!(f, "USER {}", name),
            FtpCommand::PASS(password) => write!(f, "PASS {}", password),
            FtpCommand::TYPE(kind) => write!(f, "TYPE {}", kind),
            FtpCommand::CWD(path) => write!(f, "CWD {}", path),
            FtpCommand::PWD => write!(f, "PWD"),
            FtpCommand::MKD(path) => write!(f, "MKD {}", path),
            FtpCommand::DELE(path) => write!(f, "DELE {}", path),
            FtpCommand::PASV => write!(f, "PASV"),
            FtpCommand::PORT(addr) => write!(f, "PORT {}", format_port_argument(*addr)),
            FtpCommand::LIST => write!(f, "LIST"),
            FtpCommand::RETR(path) => write!(f, "RETR {}", path),
            FtpCommand::STOR(path) => write!(f, "STOR {}", path),
            FtpCommand::NOOP => write!(f, "NOOP"),
            FtpCommand::QUIT => write!(f, "QUIT"),
        }
    }
}

/// Encodes an IPv4 socket address as `h1,h2,h3,h4,p1,p2`.
pub fn format_port_argument(addr: SocketAddrV4) -> String {
    let [h1, h2, h3, h4] = addr.ip().octets();
    let [p1, p2] = addr.port().to_be_bytes();
    format!("{},{},{},{},{},{}", h1, h2, h3, h4, p1, p2)
}

/// Renders a command with its terminator, truncating the command text so the
/// whole line fits in `max_len` bytes. The terminator is never cut.
pub fn frame_command(command: &FtpCommand, max_len: usize) -> Vec<u8> {
    let mut line = command.to_string();
    let limit = max_len.saturating_sub(TERMINATOR.len());

    if line.len() > limit {
        let mut cut = limit;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        warn!(
            "Command {} longer than {} bytes, truncating",
            command.log_form(),
            max_len
        );
        line.truncate(cut);
    }

    line.push_str(TERMINATOR);
    line.into_bytes()
}
