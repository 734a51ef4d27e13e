//! FTP Protocol implementation
//!
//! Handles command framing, line reading and reply parsing.

pub mod commands;
pub mod parser;
pub mod reader;
pub mod responses;

pub use commands::{FtpCommand, format_port_argument, frame_command};
pub use parser::{ReplyLimits, read_reply, reply_code};
pub use reader::{Line, read_line};
pub use responses::Reply;
