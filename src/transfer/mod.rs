//! Transfer module for the FTP client
//!
//! Handles data channel negotiation, the data phase of LIST/RETR/STOR, and
//! the final reply that closes each transfer.

pub mod data_channel;
pub mod executor;
pub mod file_ops;
pub mod modes;
pub mod operations;
pub mod results;

// Re-export key types and functions
pub use data_channel::DataChannel;
pub use executor::{
    Direction, ListingSink, TransferHandle, TransferJob, finish_transfer, run_transfer,
    start_transfer,
};
pub use modes::TransferMode;
pub use operations::{negotiate, parse_pasv_reply, setup_active_mode, setup_passive_mode};
pub use results::{ActiveModeResult, PassiveModeResult, TransferReport};
