//! FTP Transfer modes
//!
//! Selects which side opens the data connection.

use std::fmt;

/// FTP data connection modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Server listens (PASV), client connects.
    Passive,
    /// Client listens (PORT), server connects.
    Active,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Passive => write!(f, "passive"),
            TransferMode::Active => write!(f, "active"),
        }
    }
}
