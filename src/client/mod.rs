//! Client front end
//!
//! The session API over one control connection, and the interactive shell
//! that drives it from standard input.

pub mod commands;
pub mod handler;
pub mod output;
pub mod prompt;
pub mod session;

pub use commands::{UserCommand, parse_user_command};
pub use handler::run;
pub use output::{Output, Stdio};
pub use session::Session;
