//! Terminal prompts
//!
//! Reads a password from the terminal without echoing it.

use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Prints `label` and reads one line with echo disabled.
///
/// Blocking; run it on a blocking thread from async code. Ctrl-C and Ctrl-D
/// abort with `ErrorKind::Interrupted` and `ErrorKind::UnexpectedEof`.
pub fn read_password(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut password = String::new();
    {
        let _guard = RawModeGuard::enable()?;
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            else {
                continue;
            };
            if kind == KeyEventKind::Release {
                continue;
            }

            match code {
                KeyCode::Enter => break,
                KeyCode::Backspace => {
                    password.pop();
                }
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
                }
                KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                KeyCode::Char(c) => password.push(c),
                _ => {}
            }
        }
    }

    println!();
    Ok(password)
}
