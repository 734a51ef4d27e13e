//! RAX FTP Client - Entry Point
//!
//! Interactive FTP client supporting passive and active transfers.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;

use rax_ftp_client::client::{self, Session};
use rax_ftp_client::config::ClientConfig;
use rax_ftp_client::error::{FtpError, exit_code, handle_error};
use rax_ftp_client::utils::logging::setup_logging;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive FTP client")]
struct Args {
    /// Server host name or address (default: `host` from the config)
    host: Option<String>,

    /// Server control port (default: `port` from the config)
    port: Option<u16>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User name to log in with; prompted for when omitted
    #[arg(short, long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() {
    setup_logging();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        handle_error(&e);
        eprintln!("{}", e);
        process::exit(exit_code(&e));
    }
}

async fn run(args: Args) -> Result<(), FtpError> {
    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    info!("Connecting to {}", config.server_addr());
    let (session, greeting) = Session::connect(config).await?;
    println!("{}", greeting.text().trim_end());
    if !greeting.is_success() {
        eprintln!("Server refused the connection");
        process::exit(1);
    }

    client::run(session, args.user).await?;
    info!("Session closed");
    Ok(())
}
