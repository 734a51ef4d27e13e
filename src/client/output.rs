//! Shell output
//!
//! Where the shell writes replies, diagnostics and directory listings.

use std::io::{self, Write};

use crate::transfer::ListingSink;

/// Destination for everything the shell shows the user.
pub trait Output {
    /// Writes user-facing text as is.
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Writes a diagnostic line.
    fn report(&mut self, text: &str) -> io::Result<()>;

    /// Sink for the bytes of a directory listing.
    fn listing_sink(&mut self) -> ListingSink;
}

/// The process's standard output and standard error.
pub struct Stdio;

impl Output for Stdio {
    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn report(&mut self, text: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{}", text)
    }

    fn listing_sink(&mut self) -> ListingSink {
        ListingSink::Stdout
    }
}
