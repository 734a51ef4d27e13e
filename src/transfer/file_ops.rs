//! Module `file_ops`
//!
//! Byte pumps for the data phase: socket to local sink for downloads and
//! listings, local file to socket for uploads. These run on the transfer
//! task and never touch the control connection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransferError;
use crate::utils::network::{with_deadline, write_fully};

/// Sibling path a download is written to before it is renamed into place.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Maps a local I/O failure to a transfer error naming the file.
pub(crate) fn local_error(path: &Path) -> impl Fn(std::io::Error) -> TransferError + '_ {
    move |source| TransferError::LocalFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies everything from `source` into `sink` until end-of-stream, in the
/// order received. Read faults are data errors; write faults go through
/// `sink_error`.
pub async fn receive_into<R, W, E>(
    source: &mut R,
    sink: &mut W,
    buffer_size: usize,
    idle_timeout: Option<Duration>,
    sink_error: E,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    E: Fn(std::io::Error) -> TransferError,
{
    let mut buffer = vec![0u8; buffer_size];
    let mut total_bytes_received = 0u64;

    loop {
        let n = match with_deadline(idle_timeout, source.read(&mut buffer)).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Data connection read failed after {total_bytes_received} bytes: {e}");
                return Err(TransferError::DataIo(e));
            }
        };

        sink.write_all(&buffer[..n]).await.map_err(&sink_error)?;
        total_bytes_received += n as u64;
    }

    sink.flush().await.map_err(&sink_error)?;
    Ok(total_bytes_received)
}

/// Copies a local file to the data connection, then closes the write side so
/// the server sees end-of-file.
pub async fn send_from<R, W>(
    source: &mut R,
    source_path: &Path,
    data_stream: &mut W,
    buffer_size: usize,
    idle_timeout: Option<Duration>,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; buffer_size];
    let mut total_bytes_sent = 0u64;

    loop {
        let n = match source.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(local_error(source_path)(e)),
        };

        if let Err(e) = with_deadline(idle_timeout, write_fully(data_stream, &buffer[..n])).await {
            error!("Data connection write failed after {total_bytes_sent} bytes: {e}");
            return Err(TransferError::DataIo(e));
        }
        total_bytes_sent += n as u64;
    }

    data_stream
        .shutdown()
        .await
        .map_err(TransferError::DataIo)?;
    Ok(total_bytes_sent)
}

/// Moves a finished download into place.
pub async fn commit_download(temp: &Path, path: &Path) -> Result<(), TransferError> {
    fs::rename(temp, path).await.map_err(|e| {
        error!("Failed to rename {} to {}: {}", temp.display(), path.display(), e);
        local_error(path)(e)
    })?;
    info!("Saved {}", path.display());
    Ok(())
}

/// Removes a partial download, if any.
pub async fn discard_download(temp: &Path) {
    match fs::remove_file(temp).await {
        Ok(()) => info!("Removed partial download {}", temp.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", temp.display(), e),
    }
}

/// Opens the source of an upload.
pub async fn open_source(path: &Path) -> Result<File, TransferError> {
    File::open(path).await.map_err(local_error(path))
}

/// Creates the temporary destination of a download.
///
/// Fails if the temporary name is already taken, so an existing file is
/// never overwritten.
pub async fn create_destination(path: &Path) -> Result<(File, PathBuf), TransferError> {
    let temp = temp_path_for(path);
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await
        .map_err(local_error(&temp))?;
    Ok((file, temp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(temp_path_for(Path::new("a.txt")), PathBuf::from("a.txt.tmp"));
        assert_eq!(
            temp_path_for(Path::new("/data/README")),
            PathBuf::from("/data/README.tmp")
        );
    }

    #[tokio::test]
    async fn test_receive_preserves_order_across_chunks() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut source: &[u8] = &payload;
        let mut sink = Vec::new();

        let n = receive_into(&mut source, &mut sink, 7, None, TransferError::DataIo)
            .await
            .unwrap();
        assert_eq!(n, payload.len() as u64);
        assert_eq!(sink, payload);
    }

    #[tokio::test]
    async fn test_send_then_shutdown() {
        let (mut client, mut server) = tokio::io::duplex(16);
        let payload = b"hello over the data channel".to_vec();
        let mut source: &[u8] = &payload;

        let reader = tokio::spawn(async move {
            let mut received = Vec::new();
            server.read_to_end(&mut received).await.unwrap();
            received
        });

        let n = send_from(&mut source, Path::new("hello.txt"), &mut client, 4, None)
            .await
            .unwrap();
        assert_eq!(n, payload.len() as u64);
        assert_eq!(reader.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_open_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.bin");
        assert!(matches!(
            open_source(&missing).await,
            Err(TransferError::LocalFile { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let (mut file, temp) = create_destination(&path).await.unwrap();
        file.write_all(b"data").await.unwrap();
        file.flush().await.unwrap();
        drop(file);
        commit_download(&temp, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
        assert!(!temp.exists());

        let (_file, temp) = create_destination(&path).await.unwrap();
        discard_download(&temp).await;
        assert!(!temp.exists());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_existing_temp_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let temp = temp_path_for(&path);
        std::fs::write(&temp, b"keep me").unwrap();

        match create_destination(&path).await {
            Err(TransferError::LocalFile { path: failed, source }) => {
                assert_eq!(failed, temp);
                assert_eq!(source.kind(), ErrorKind::AlreadyExists);
            }
            other => panic!("expected LocalFile error, got {:?}", other.map(|(_, p)| p)),
        }
        assert_eq!(std::fs::read(&temp).unwrap(), b"keep me");
    }
}
