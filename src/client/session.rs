//! Client session
//!
//! One operation per user-level command, all running over a single control
//! connection. The session never reads user input or prints prompts.

use std::path::{Path, PathBuf};

use log::info;
use tokio::io::AsyncWrite;

use crate::config::ClientConfig;
use crate::control::ControlConnection;
use crate::error::FtpError;
use crate::protocol::{FtpCommand, Reply};
use crate::transfer::{
    TransferHandle, TransferJob, TransferMode, TransferReport, finish_transfer, run_transfer,
    start_transfer,
};

/// Local file name used when downloading `remote`: its last path component.
pub fn local_name_for(remote: &str) -> PathBuf {
    Path::new(remote)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(remote))
}

/// Remote name used when uploading `local`: its file name.
pub fn remote_name_for(local: &Path) -> String {
    local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| local.to_string_lossy().into_owned())
}

/// Manages one logged-in (or logging-in) FTP session
pub struct Session {
    control: ControlConnection,
    config: ClientConfig,
}

impl Session {
    /// Connects to the configured server and reads its greeting.
    ///
    /// A 1xx greeting ("service ready in nnn minutes") is followed by the
    /// real one, which is returned instead.
    pub async fn connect(config: ClientConfig) -> Result<(Self, Reply), FtpError> {
        let mut control = ControlConnection::connect(&config).await?;
        let mut greeting = control.read_reply().await?;
        while greeting.is_preliminary() {
            info!("Server not ready yet: {}", greeting.text().trim_end());
            greeting = control.read_reply().await?;
        }
        info!("Server greeting: {}", greeting.text().trim_end());
        Ok((Self { control, config }, greeting))
    }

    pub fn control(&self) -> &ControlConnection {
        &self.control
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // --------------------
    // Login
    // --------------------

    pub async fn user(&mut self, username: &str) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::USER(username.to_string()))
            .await
    }

    pub async fn pass(&mut self, password: &str) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::PASS(password.to_string()))
            .await
    }

    /// Sends USER, and PASS when the server asks for it. Returns the last reply.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Reply, FtpError> {
        let reply = self.user(username).await?;
        if !reply.is_intermediate() {
            return Ok(reply);
        }
        self.pass(password).await
    }

    /// Switches to binary (image) representation.
    pub async fn binary(&mut self) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::TYPE("I".to_string()))
            .await
    }

    // --------------------
    // Simple commands
    // --------------------

    pub async fn cwd(&mut self, path: &str) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::CWD(path.to_string()))
            .await
    }

    pub async fn pwd(&mut self) -> Result<Reply, FtpError> {
        self.control.send_command(&FtpCommand::PWD).await
    }

    pub async fn mkd(&mut self, path: &str) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::MKD(path.to_string()))
            .await
    }

    pub async fn dele(&mut self, path: &str) -> Result<Reply, FtpError> {
        self.control
            .send_command(&FtpCommand::DELE(path.to_string()))
            .await
    }

    pub async fn noop(&mut self) -> Result<Reply, FtpError> {
        self.control.send_command(&FtpCommand::NOOP).await
    }

    /// Sends QUIT and closes the control connection.
    pub async fn quit(&mut self) -> Result<Reply, FtpError> {
        let reply = self.control.send_command(&FtpCommand::QUIT).await?;
        self.control.shutdown().await?;
        Ok(reply)
    }

    // --------------------
    // Transfers
    // --------------------

    /// LIST in passive mode, printed to standard output.
    pub async fn list(&mut self) -> Result<TransferReport, FtpError> {
        run_transfer(&mut self.control, TransferJob::listing(), TransferMode::Passive).await
    }

    /// LIST in passive mode into `writer`.
    pub async fn list_to<W>(&mut self, writer: W) -> Result<TransferReport, FtpError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        run_transfer(
            &mut self.control,
            TransferJob::listing_to(writer),
            TransferMode::Passive,
        )
        .await
    }

    /// RETR in passive mode into a local file of the same name.
    pub async fn get(&mut self, remote: &str) -> Result<TransferReport, FtpError> {
        let job = TransferJob::download(remote, local_name_for(remote));
        run_transfer(&mut self.control, job, TransferMode::Passive).await
    }

    /// STOR in passive mode.
    pub async fn put(&mut self, local: &Path) -> Result<TransferReport, FtpError> {
        let job = TransferJob::upload(local, remote_name_for(local));
        run_transfer(&mut self.control, job, TransferMode::Passive).await
    }

    /// STOR in active mode.
    pub async fn pput(&mut self, local: &Path) -> Result<TransferReport, FtpError> {
        let job = TransferJob::upload(local, remote_name_for(local));
        run_transfer(&mut self.control, job, TransferMode::Active).await
    }

    /// Starts a transfer and returns once its data phase is running.
    pub async fn start(
        &mut self,
        job: TransferJob,
        mode: TransferMode,
    ) -> Result<TransferHandle, FtpError> {
        start_transfer(&mut self.control, job, mode).await
    }

    /// Waits for a started transfer and reads its final reply.
    pub async fn finish(&mut self, handle: TransferHandle) -> Result<TransferReport, FtpError> {
        finish_transfer(&mut self.control, handle).await
    }
}
