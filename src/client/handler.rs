//! Interactive shell
//!
//! Drives a `Session` from lines typed on standard input: login first, then
//! one `ftp>` command per line until `quit` or end of input.

use std::io::IsTerminal;
use std::path::Path;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::client::commands::{UserCommand, help_text, parse_user_command};
use crate::client::output::{Output, Stdio};
use crate::client::prompt::read_password;
use crate::client::session::{Session, local_name_for, remote_name_for};
use crate::error::{FtpError, NegotiationError, TransferError, is_fatal};
use crate::protocol::Reply;
use crate::transfer::{TransferJob, TransferMode, TransferReport};
use crate::utils::validation::is_valid_argument;

type InputLines = Lines<BufReader<Stdin>>;

/// What the shell does after a command
#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

/// Runs the login dialogue and the command loop on the terminal.
///
/// Returns `Ok` when the user quits or input ends, and the error when the
/// control connection fails.
pub async fn run(mut session: Session, username: Option<String>) -> Result<(), FtpError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = Stdio;

    if !login(&mut session, username, &mut input, &mut out).await? {
        info!("Input ended during login");
        return Ok(());
    }

    if session.config().binary_mode {
        let reply = session.binary().await?;
        print_reply(&mut out, &reply)?;
    }

    out.print(&format!("{}\n", help_text()))?;

    loop {
        let Some(line) = prompt_line("ftp> ", &mut input, &mut out).await? else {
            break;
        };

        match dispatch(&mut session, parse_user_command(&line), &mut out).await? {
            Flow::Continue => {}
            Flow::Quit => return Ok(()),
        }
    }

    info!("Input ended, closing session");
    if let Err(e) = session.quit().await {
        warn!("QUIT failed: {}", e);
    }
    Ok(())
}

/// Repeats USER/PASS until the server accepts. Returns false on end of input.
async fn login(
    session: &mut Session,
    mut username: Option<String>,
    input: &mut InputLines,
    out: &mut impl Output,
) -> Result<bool, FtpError> {
    loop {
        let name = match username.take() {
            Some(name) => name,
            None => match prompt_line("Name: ", input, out).await? {
                Some(name) => name.trim().to_string(),
                None => return Ok(false),
            },
        };
        if !is_valid_argument(&name) {
            out.print("A user name is required\n")?;
            continue;
        }

        let reply = session.user(&name).await?;
        print_reply(out, &reply)?;
        if reply.is_success() {
            return Ok(true);
        }
        if !reply.is_intermediate() {
            continue;
        }

        let Some(password) = read_secret(input, out).await? else {
            return Ok(false);
        };
        let reply = session.pass(&password).await?;
        print_reply(out, &reply)?;
        if reply.is_success() {
            return Ok(true);
        }
    }
}

/// Reads the password, masked when stdin is a terminal.
async fn read_secret(
    input: &mut InputLines,
    out: &mut impl Output,
) -> Result<Option<String>, FtpError> {
    if !std::io::stdin().is_terminal() {
        return prompt_line("Password: ", input, out).await;
    }

    let entered = tokio::task::spawn_blocking(|| read_password("Password: "))
        .await
        .map_err(std::io::Error::other)?;
    match entered {
        Ok(password) => Ok(Some(password)),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints `label` and reads one line. `None` at end of input.
async fn prompt_line(
    label: &str,
    input: &mut InputLines,
    out: &mut impl Output,
) -> Result<Option<String>, FtpError> {
    out.print(label)?;
    Ok(input.next_line().await?)
}

/// Runs one command. Failures that leave the control connection usable are
/// reported to `out`; the rest are returned.
async fn dispatch(
    session: &mut Session,
    command: UserCommand,
    out: &mut impl Output,
) -> Result<Flow, FtpError> {
    match execute(session, command, out).await {
        Ok(flow) => Ok(flow),
        Err(e) if is_fatal(&e) => Err(e),
        Err(e) => {
            report_error(out, &e)?;
            Ok(Flow::Continue)
        }
    }
}

async fn execute(
    session: &mut Session,
    command: UserCommand,
    out: &mut impl Output,
) -> Result<Flow, FtpError> {
    match command {
        UserCommand::Empty => {}
        UserCommand::Help => out.print(&format!("{}\n", help_text()))?,
        UserCommand::Usage(usage) => out.print(&format!("Usage: {}\n", usage))?,
        UserCommand::Unknown(name) => out.print(&format!(
            "Unknown command '{}'. Type 'help' for a list.\n",
            name
        ))?,
        UserCommand::Pwd => print_reply(out, &session.pwd().await?)?,
        UserCommand::Cd(dir) => print_reply(out, &session.cwd(&dir).await?)?,
        UserCommand::Mkd(dir) => print_reply(out, &session.mkd(&dir).await?)?,
        UserCommand::Dele(file) => print_reply(out, &session.dele(&file).await?)?,
        UserCommand::Dir => {
            let job = TransferJob::listing_into(out.listing_sink());
            transfer(session, job, TransferMode::Passive, out).await?
        }
        UserCommand::Get(remote) => {
            let job = TransferJob::download(remote.as_str(), local_name_for(&remote));
            transfer(session, job, TransferMode::Passive, out).await?
        }
        UserCommand::Put(local) => {
            let path = Path::new(&local);
            let job = TransferJob::upload(path, remote_name_for(path));
            transfer(session, job, TransferMode::Passive, out).await?
        }
        UserCommand::PPut(local) => {
            let path = Path::new(&local);
            let job = TransferJob::upload(path, remote_name_for(path));
            transfer(session, job, TransferMode::Active, out).await?
        }
        UserCommand::Quit => {
            print_reply(out, &session.quit().await?)?;
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}

/// Starts a transfer, tells the user, then waits for it to complete.
async fn transfer(
    session: &mut Session,
    job: TransferJob,
    mode: TransferMode,
    out: &mut impl Output,
) -> Result<(), FtpError> {
    let handle = session.start(job, mode).await?;
    print_reply(out, handle.preliminary())?;
    out.print("Transfer started\n")?;

    let report = session.finish(handle).await?;
    print_report(out, &report)?;
    Ok(())
}

fn print_reply(out: &mut impl Output, reply: &Reply) -> std::io::Result<()> {
    out.print(reply.text())?;
    if !reply.text().ends_with('\n') {
        out.print("\n")?;
    }
    Ok(())
}

fn print_report(out: &mut impl Output, report: &TransferReport) -> std::io::Result<()> {
    if let Some(e) = &report.data_error {
        out.report(&format!("Transfer failed: {}", e))?;
    }
    print_reply(out, &report.final_reply)?;
    if report.is_success() {
        out.print(&format!("{} bytes transferred\n", report.bytes))?;
    }
    Ok(())
}

/// Tells the user about a command that failed without ending the session.
fn report_error(out: &mut impl Output, err: &FtpError) -> std::io::Result<()> {
    match err {
        FtpError::Transfer(TransferError::Refused(reply))
        | FtpError::Negotiation(NegotiationError::Refused(reply)) => print_reply(out, reply),
        other => out.report(&format!("Error: {}", other)),
    }
}
