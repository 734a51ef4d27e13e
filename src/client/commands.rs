//! Module `commands`
//!
//! Parses the lines typed at the `ftp>` prompt.

use crate::utils::validation::is_valid_argument;

/// A command typed by the user.
#[derive(Debug, PartialEq)]
pub enum UserCommand {
    Help,
    Dir,
    Get(String),
    Put(String),
    PPut(String),
    Cd(String),
    Pwd,
    Mkd(String),
    Dele(String),
    Quit,
    Empty,
    /// Known command used without a valid argument; holds its usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Parses a raw input line into a `UserCommand`.
pub fn parse_user_command(raw: &str) -> UserCommand {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_lowercase();
    let arg = parts.next().unwrap_or("").trim();

    let with_arg = |build: fn(String) -> UserCommand, usage: &'static str| {
        if is_valid_argument(arg) {
            build(arg.to_string())
        } else {
            UserCommand::Usage(usage)
        }
    };

    match cmd.as_str() {
        "" => UserCommand::Empty,
        "help" | "?" => UserCommand::Help,
        "dir" | "ls" => UserCommand::Dir,
        "get" => with_arg(UserCommand::Get, "get <file>"),
        "put" => with_arg(UserCommand::Put, "put <file>"),
        "pput" => with_arg(UserCommand::PPut, "pput <file>"),
        "cd" => with_arg(UserCommand::Cd, "cd <dir>"),
        "pwd" => UserCommand::Pwd,
        "mkd" | "mkdir" => with_arg(UserCommand::Mkd, "mkd <dir>"),
        "dele" | "delete" => with_arg(UserCommand::Dele, "dele <file>"),
        "quit" | "exit" | "bye" => UserCommand::Quit,
        _ => UserCommand::Unknown(cmd),
    }
}

/// Help text listing the available commands
pub fn help_text() -> &'static str {
    "Commands:\n \
     help           - show this help\n \
     dir            - list the remote directory (passive mode)\n \
     get <file>     - download a file (passive mode)\n \
     put <file>     - upload a file (passive mode)\n \
     pput <file>    - upload a file (active mode)\n \
     cd <dir>       - change remote directory\n \
     pwd            - print remote directory\n \
     mkd <dir>      - create remote directory\n \
     dele <file>    - delete remote file\n \
     quit           - close the session"
}
