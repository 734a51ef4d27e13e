//! Control channel
//!
//! The command/reply connection shared by every session operation.

pub mod connection;

pub use connection::ControlConnection;
