//! Transfer executor
//!
//! Runs one LIST/RETR/STOR from data channel negotiation to the final
//! control reply. The data phase runs on its own tokio task, which owns the
//! data connection and the local file. The caller keeps the control
//! connection and reads the final reply only after that task has finished.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::control::ControlConnection;
use crate::error::{FtpError, TransferError};
use crate::protocol::{FtpCommand, Reply};
use crate::transfer::data_channel::DataChannel;
use crate::transfer::file_ops::{
    commit_download, create_destination, discard_download, local_error, open_source,
    receive_into, send_from,
};
use crate::transfer::modes::TransferMode;
use crate::transfer::operations::negotiate;
use crate::transfer::results::TransferReport;

/// Which way the payload flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
    Listing,
}

/// Where listing bytes are written
pub enum ListingSink {
    Stdout,
    Writer(Box<dyn AsyncWrite + Send + Unpin>),
}

/// One transfer request.
pub struct TransferJob {
    direction: Direction,
    remote: Option<String>,
    local: Option<PathBuf>,
    sink: Option<ListingSink>,
}

impl TransferJob {
    /// RETR `remote` into the local file `local`.
    pub fn download(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            direction: Direction::Download,
            remote: Some(remote.into()),
            local: Some(local.into()),
            sink: None,
        }
    }

    /// STOR the local file `local` as `remote`.
    pub fn upload(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            direction: Direction::Upload,
            remote: Some(remote.into()),
            local: Some(local.into()),
            sink: None,
        }
    }

    /// LIST to standard output.
    pub fn listing() -> Self {
        Self::listing_into(ListingSink::Stdout)
    }

    /// LIST into the given writer.
    pub fn listing_to<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::listing_into(ListingSink::Writer(Box::new(writer)))
    }

    /// LIST into `sink`.
    pub fn listing_into(sink: ListingSink) -> Self {
        Self {
            direction: Direction::Listing,
            remote: None,
            local: None,
            sink: Some(sink),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local.as_deref()
    }

    fn command(&self) -> FtpCommand {
        let remote = self.remote.clone().unwrap_or_default();
        match self.direction {
            Direction::Download => FtpCommand::RETR(remote),
            Direction::Upload => FtpCommand::STOR(remote),
            Direction::Listing => FtpCommand::LIST,
        }
    }
}

impl fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferJob")
            .field("direction", &self.direction)
            .field("remote", &self.remote)
            .field("local", &self.local)
            .finish()
    }
}

/// Local side of a transfer, opened before any network I/O.
enum LocalEndpoint {
    Source { file: File, path: PathBuf },
    Destination { file: File, temp: PathBuf, path: PathBuf },
    Sink(ListingSink),
}

impl LocalEndpoint {
    async fn prepare(job: &mut TransferJob) -> Result<Self, TransferError> {
        match (job.direction, job.local.clone()) {
            (Direction::Upload, Some(path)) => {
                let file = open_source(&path).await?;
                Ok(LocalEndpoint::Source { file, path })
            }
            (Direction::Download, Some(path)) => {
                let (file, temp) = create_destination(&path).await?;
                Ok(LocalEndpoint::Destination { file, temp, path })
            }
            _ => Ok(LocalEndpoint::Sink(
                job.sink.take().unwrap_or(ListingSink::Stdout),
            )),
        }
    }

    /// Releases the endpoint when no data phase will happen.
    async fn discard(self) {
        if let LocalEndpoint::Destination { file, temp, .. } = self {
            drop(file);
            discard_download(&temp).await;
        }
    }
}

/// Links `finish_transfer` to a worker that is still waiting for the
/// server's active-mode connection.
struct AcceptWatch {
    /// Resolves once the worker is past the accept, successfully or not.
    accepted: oneshot::Receiver<()>,
    /// Dropping it makes the worker give up waiting.
    cancel: oneshot::Sender<()>,
}

/// A transfer whose data phase is running.
///
/// Must be passed to `finish_transfer`; until then the control connection
/// refuses new commands.
pub struct TransferHandle {
    direction: Direction,
    preliminary: Reply,
    worker: JoinHandle<Result<u64, TransferError>>,
    accept_watch: Option<AcceptWatch>,
}

impl TransferHandle {
    /// The 1xx reply that opened the data phase.
    pub fn preliminary(&self) -> &Reply {
        &self.preliminary
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns whether the data phase has ended.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

/// Opens the local endpoint, negotiates the data channel, sends the transfer
/// command and spawns the data phase.
///
/// A reply other than 1xx is a refusal: no data is read or written and
/// `TransferError::Refused` carries the reply.
pub async fn start_transfer(
    ctrl: &mut ControlConnection,
    mut job: TransferJob,
    mode: TransferMode,
) -> Result<TransferHandle, FtpError> {
    if ctrl.is_transfer_pending() {
        return Err(TransferError::Busy.into());
    }

    let local = LocalEndpoint::prepare(&mut job).await?;

    let channel = match negotiate(ctrl, mode).await {
        Ok(channel) => channel,
        Err(e) => {
            local.discard().await;
            return Err(e);
        }
    };

    let command = job.command();
    let preliminary = match ctrl.send_command(&command).await {
        Ok(reply) => reply,
        Err(e) => {
            local.discard().await;
            return Err(e);
        }
    };

    if !preliminary.is_preliminary() {
        warn!(
            "{} refused: {}",
            command.log_form(),
            preliminary.text().trim_end()
        );
        drop(channel);
        local.discard().await;
        return Err(TransferError::Refused(preliminary).into());
    }

    info!("Starting {:?} in {} mode: {}", job.direction, mode, command);

    let buffer_size = ctrl.buffer_size();
    let idle_timeout = ctrl.idle_timeout();
    let (accept_watch, signals) = match channel {
        DataChannel::Listening { .. } => {
            let (accepted_tx, accepted) = oneshot::channel();
            let (cancel, cancel_rx) = oneshot::channel();
            (
                Some(AcceptWatch { accepted, cancel }),
                Some((accepted_tx, cancel_rx)),
            )
        }
        DataChannel::Connected(_) => (None, None),
    };
    let worker = tokio::spawn(async move {
        run_data_phase(channel, local, buffer_size, idle_timeout, signals).await
    });
    ctrl.set_awaiting_final_reply(true);

    Ok(TransferHandle {
        direction: job.direction,
        preliminary,
        worker,
        accept_watch,
    })
}

/// Waits for the data phase, then reads the final control reply.
///
/// The final reply is read even when the data phase failed, so the control
/// connection stays in step with the server. Only a failure to read that
/// reply is returned as an error.
///
/// In active mode the server may answer (e.g. 425) without ever connecting.
/// A reply that arrives before the data connection is therefore read while
/// the worker waits: a failure reply ends the wait and becomes the final
/// reply, a success reply is kept and the data phase still runs.
pub async fn finish_transfer(
    ctrl: &mut ControlConnection,
    handle: TransferHandle,
) -> Result<TransferReport, FtpError> {
    let TransferHandle {
        direction,
        preliminary,
        worker,
        accept_watch,
    } = handle;

    let mut early_reply = None;
    let mut cancel = None;
    if let Some(AcceptWatch {
        mut accepted,
        cancel: cancel_tx,
    }) = accept_watch
    {
        cancel = Some(cancel_tx);
        loop {
            tokio::select! {
                _ = &mut accepted => break,
                ready = ctrl.wait_for_reply() => {
                    let reply = match ready {
                        Ok(()) => ctrl.read_interim_reply().await,
                        Err(e) => Err(e),
                    };
                    let reply = match reply {
                        Ok(reply) => reply,
                        Err(e) => {
                            // Worker gives up on its own once `cancel` drops.
                            ctrl.set_awaiting_final_reply(false);
                            return Err(e);
                        }
                    };
                    if reply.is_preliminary() {
                        debug!("Additional preliminary reply: {}", reply.text().trim_end());
                        continue;
                    }
                    if !reply.is_success() {
                        warn!(
                            "Server ended the {:?} before connecting: {}",
                            direction,
                            reply.text().trim_end()
                        );
                        cancel = None;
                    }
                    early_reply = Some(reply);
                    break;
                }
            }
        }
    }

    let (bytes, data_error) = match worker.await {
        Ok(Ok(bytes)) => (bytes, None),
        Ok(Err(e)) => {
            error!("{:?} data phase failed: {}", direction, e);
            (0, Some(e))
        }
        Err(e) => {
            error!("{:?} transfer task ended abnormally: {}", direction, e);
            (0, Some(TransferError::WorkerLost(e.to_string())))
        }
    };
    drop(cancel);

    let final_reply = match early_reply {
        Some(reply) => {
            ctrl.set_awaiting_final_reply(false);
            reply
        }
        None => ctrl.read_final_reply().await?,
    };
    info!(
        "{:?} finished ({} bytes): {}",
        direction,
        bytes,
        final_reply.text().trim_end()
    );

    Ok(TransferReport {
        direction,
        bytes,
        preliminary,
        final_reply,
        data_error,
    })
}

/// Runs a whole transfer: `start_transfer` followed by `finish_transfer`.
pub async fn run_transfer(
    ctrl: &mut ControlConnection,
    job: TransferJob,
    mode: TransferMode,
) -> Result<TransferReport, FtpError> {
    let handle = start_transfer(ctrl, job, mode).await?;
    finish_transfer(ctrl, handle).await
}

/// Body of the transfer task. Owns the data channel and the local file.
///
/// `signals` is set in active mode: the first half reports that the accept
/// is over, the second aborts the accept when its sender is dropped.
async fn run_data_phase(
    channel: DataChannel,
    local: LocalEndpoint,
    buffer_size: usize,
    idle_timeout: Option<std::time::Duration>,
    signals: Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>,
) -> Result<u64, TransferError> {
    let established = match signals {
        Some((accepted, cancel)) => {
            let result = tokio::select! {
                result = channel.establish(idle_timeout) => result,
                _ = cancel => Err(TransferError::AcceptFailed(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "server replied before opening the data connection",
                ))),
            };
            let _ = accepted.send(());
            result
        }
        None => channel.establish(idle_timeout).await,
    };

    let mut stream = match established {
        Ok(stream) => stream,
        Err(e) => {
            local.discard().await;
            return Err(e);
        }
    };

    match local {
        LocalEndpoint::Source { mut file, path } => {
            send_from(&mut file, &path, &mut stream, buffer_size, idle_timeout).await
        }
        LocalEndpoint::Destination {
            mut file,
            temp,
            path,
        } => {
            let received =
                receive_into(&mut stream, &mut file, buffer_size, idle_timeout, local_error(&path))
                    .await;
            let received = match received {
                Ok(bytes) => file.sync_all().await.map(|_| bytes).map_err(local_error(&path)),
                Err(e) => Err(e),
            };
            drop(file);

            match received {
                Ok(bytes) => {
                    commit_download(&temp, &path).await?;
                    Ok(bytes)
                }
                Err(e) => {
                    discard_download(&temp).await;
                    Err(e)
                }
            }
        }
        LocalEndpoint::Sink(ListingSink::Stdout) => {
            let mut stdout = tokio::io::stdout();
            receive_into(&mut stream, &mut stdout, buffer_size, idle_timeout, TransferError::DataIo)
                .await
        }
        LocalEndpoint::Sink(ListingSink::Writer(mut writer)) => {
            let result = receive_into(
                &mut stream,
                &mut writer,
                buffer_size,
                idle_timeout,
                TransferError::DataIo,
            )
            .await;
            let closed = writer.shutdown().await;
            match (result, closed) {
                (Ok(bytes), Ok(())) => Ok(bytes),
                (Ok(_), Err(e)) => {
                    error!("Failed to close listing output: {}", e);
                    Err(TransferError::DataIo(e))
                }
                (Err(e), closed) => {
                    if let Err(close_err) = closed {
                        warn!("Failed to close listing output: {}", close_err);
                    }
                    Err(e)
                }
            }
        }
    }
}
