//! Error handling
//!
//! Defines error types and handling for the FTP client.

pub mod handlers;
pub mod types;

pub use handlers::{exit_code, handle_error, is_fatal};
pub use types::*;
