pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod transfer;
pub mod utils;

pub use client::Session;
pub use config::ClientConfig;
pub use control::ControlConnection;
pub use error::FtpError;
