//! Network utilities
//!
//! Deadline and full-write helpers shared by the control and data channels.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Runs an I/O future under an optional deadline.
///
/// An elapsed deadline is reported as `ErrorKind::TimedOut`.
pub async fn with_deadline<T, F>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                ErrorKind::TimedOut,
                format!("operation timed out after {:?}", limit),
            )),
        },
        None => fut.await,
    }
}

/// Connects to `addr`, bounded by `limit` when set.
pub async fn connect_with_timeout<A>(addr: A, limit: Option<Duration>) -> io::Result<TcpStream>
where
    A: ToSocketAddrs,
{
    with_deadline(limit, TcpStream::connect(addr)).await
}

/// Writes the whole buffer, retrying short and interrupted writes.
pub async fn write_fully<W>(writer: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sent = 0;
    while sent < buf.len() {
        match writer.write(&buf[sent..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "peer stopped accepting data",
                ));
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    writer.flush().await
}
