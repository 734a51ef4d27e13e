use std::future::Future;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rax_ftp_client::error::{FtpError, ProtocolError, TransferError, is_fatal};
use rax_ftp_client::transfer::{Direction, TransferJob, TransferMode};
use rax_ftp_client::{ClientConfig, Session};

type Control = BufReader<TcpStream>;

// Helper: starts a one-connection server that greets, then runs `script`
async fn mock_server<F, Fut, T>(script: F) -> (ClientConfig, JoinHandle<T>)
where
    F: FnOnce(Control) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut control = BufReader::new(stream);
        send(&mut control, "220 mock server ready\r\n").await;
        script(control).await
    });

    let config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        idle_timeout_secs: 5,
        ..ClientConfig::default()
    };
    (config, task)
}

async fn send(control: &mut Control, reply: &str) {
    control.get_mut().write_all(reply.as_bytes()).await.unwrap();
}

async fn expect(control: &mut Control, command: &str) -> String {
    let mut line = String::new();
    control.read_line(&mut line).await.unwrap();
    assert!(line.ends_with("\r\n"), "command not CRLF terminated: {:?}", line);
    let line = line.trim_end().to_string();
    assert_eq!(line, command);
    line
}

async fn read_command(control: &mut Control) -> String {
    let mut line = String::new();
    control.read_line(&mut line).await.unwrap();
    line.trim_end().to_string()
}

// Helper: answers PASV with a fresh listener on the loopback interface
async fn passive(control: &mut Control) -> TcpListener {
    expect(control, "PASV").await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let reply = format!(
        "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
        port / 256,
        port % 256
    );
    send(control, &reply).await;
    listener
}

fn parse_port_command(line: &str) -> SocketAddrV4 {
    let fields: Vec<u8> = line
        .strip_prefix("PORT ")
        .unwrap()
        .split(',')
        .map(|f| f.parse().unwrap())
        .collect();
    assert_eq!(fields.len(), 6);
    SocketAddrV4::new(
        Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]),
        u16::from(fields[4]) * 256 + u16::from(fields[5]),
    )
}

#[tokio::test]
async fn test_login_and_passive_listing() {
    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "331 Password required\r\n").await;
        expect(&mut control, "PASS wrong").await;
        send(&mut control, "530 Login incorrect\r\n").await;

        expect(&mut control, "USER bob").await;
        send(&mut control, "331 Password required\r\n").await;
        expect(&mut control, "PASS x").await;
        send(&mut control, "230 Logged in\r\n").await;

        expect(&mut control, "TYPE I").await;
        send(&mut control, "200 Switching to Binary mode\r\n").await;

        let data_listener = passive(&mut control).await;
        expect(&mut control, "LIST").await;
        let (mut data, _) = data_listener.accept().await.unwrap();
        send(&mut control, "150 Here comes the directory listing\r\n").await;
        data.write_all(b"a.txt\nb.txt\n").await.unwrap();
        drop(data);
        send(&mut control, "226 Directory send OK\r\n").await;

        expect(&mut control, "QUIT").await;
        send(&mut control, "221 Goodbye\r\n").await;
    })
    .await;

    let (mut session, greeting) = Session::connect(config).await.unwrap();
    assert_eq!(greeting.code(), Some(220));

    let reply = session.login("bob", "wrong").await.unwrap();
    assert_eq!(reply.code(), Some(530));
    let reply = session.login("bob", "x").await.unwrap();
    assert_eq!(reply.code(), Some(230));
    assert_eq!(session.binary().await.unwrap().code(), Some(200));

    let (writer, mut listing) = tokio::io::duplex(4096);
    let report = session.list_to(writer).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.direction, Direction::Listing);
    assert_eq!(report.bytes, 12);
    assert_eq!(report.preliminary.code(), Some(150));
    assert_eq!(report.final_reply.code(), Some(226));

    let mut output = Vec::new();
    listing.read_to_end(&mut output).await.unwrap();
    assert_eq!(output, b"a.txt\nb.txt\n");

    assert_eq!(session.quit().await.unwrap().code(), Some(221));
    server.await.unwrap();
}

#[tokio::test]
async fn test_user_accepted_without_password() {
    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER anonymous").await;
        send(&mut control, "230 Anonymous access granted\r\n").await;
        expect(&mut control, "PWD").await;
        send(&mut control, "257-Current directory:\r\n 200 is not a code here\r\n257 \"/pub\"\r\n").await;
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    let reply = session.login("anonymous", "unused").await.unwrap();
    assert_eq!(reply.code(), Some(230));

    let reply = session.pwd().await.unwrap();
    assert_eq!(reply.code(), Some(257));
    assert!(reply.is_complete());
    assert_eq!(reply.message(), "\"/pub\"");
    server.await.unwrap();
}

#[tokio::test]
async fn test_refused_download_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("missing.txt");

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;
        let _data_listener = passive(&mut control).await;
        expect(&mut control, "RETR missing.txt").await;
        send(&mut control, "550 Failed to open file\r\n").await;
        expect(&mut control, "NOOP").await;
        send(&mut control, "200 NOOP ok\r\n").await;
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let job = TransferJob::download("missing.txt", &local);
    match session.start(job, TransferMode::Passive).await {
        Err(FtpError::Transfer(TransferError::Refused(reply))) => {
            assert_eq!(reply.code(), Some(550));
        }
        Err(e) => panic!("expected refusal, got {}", e),
        Ok(_) => panic!("expected refusal, got a running transfer"),
    }

    assert!(!local.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(!session.control().is_transfer_pending());

    assert_eq!(session.noop().await.unwrap().code(), Some(200));
    server.await.unwrap();
}

#[tokio::test]
async fn test_download_reads_final_reply_after_data() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("payload.bin");
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
    let sent = payload.clone();

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;
        let data_listener = passive(&mut control).await;
        expect(&mut control, "RETR pub/payload.bin").await;
        let (mut data, _) = data_listener.accept().await.unwrap();

        // Completion is announced before the data has been written.
        send(
            &mut control,
            "150 Opening BINARY mode data connection\r\n226 Transfer complete\r\n",
        )
        .await;
        data.write_all(&sent).await.unwrap();
        drop(data);

        expect(&mut control, "QUIT").await;
        send(&mut control, "221 Goodbye\r\n").await;
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let handle = session
        .start(
            TransferJob::download("pub/payload.bin", &local),
            TransferMode::Passive,
        )
        .await
        .unwrap();
    assert_eq!(handle.preliminary().code(), Some(150));
    assert_eq!(handle.direction(), Direction::Download);
    assert!(session.control().is_transfer_pending());

    // Nothing else may be sent while the final reply is outstanding.
    assert!(matches!(
        session.noop().await,
        Err(FtpError::Protocol(ProtocolError::ReplyPending))
    ));
    let other = dir.path().join("other.bin");
    assert!(matches!(
        session
            .start(TransferJob::download("other.bin", &other), TransferMode::Passive)
            .await,
        Err(FtpError::Transfer(TransferError::Busy))
    ));

    let report = session.finish(handle).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.bytes, payload.len() as u64);
    assert_eq!(report.final_reply.code(), Some(226));
    assert!(!session.control().is_transfer_pending());

    assert_eq!(std::fs::read(&local).unwrap(), payload);
    assert!(!dir.path().join("payload.bin.tmp").exists());
    assert!(!other.exists());

    session.quit().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_active_mode_upload() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("upload.bin");
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 199) as u8).collect();
    std::fs::write(&local, &payload).unwrap();

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;

        let port_line = read_command(&mut control).await;
        assert!(port_line.starts_with("PORT 127,0,0,1,"), "{}", port_line);
        let target = parse_port_command(&port_line);
        send(&mut control, "200 PORT command successful\r\n").await;

        expect(&mut control, "STOR upload.bin").await;
        send(&mut control, "150 Ok to send data\r\n").await;
        let mut data = TcpStream::connect(target).await.unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        send(&mut control, "226 Transfer complete\r\n").await;
        received
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let report = session.pput(&local).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.direction, Direction::Upload);
    assert_eq!(report.bytes, payload.len() as u64);

    assert_eq!(server.await.unwrap(), payload);
}

#[tokio::test]
async fn test_passive_upload() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("notes.txt");
    std::fs::write(&local, b"first line\nsecond line\n").unwrap();

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;
        let data_listener = passive(&mut control).await;
        expect(&mut control, "STOR notes.txt").await;
        let (mut data, _) = data_listener.accept().await.unwrap();
        send(&mut control, "150 Ok to send data\r\n").await;
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        send(&mut control, "226 Transfer complete\r\n").await;
        received
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let report = session.put(&local).await.unwrap();
    assert!(report.is_success());
    assert_eq!(server.await.unwrap(), b"first line\nsecond line\n");
}

#[tokio::test]
async fn test_missing_upload_source_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.bin");

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;
        // The next command must be NOOP: no PASV or STOR for a missing file.
        expect(&mut control, "NOOP").await;
        send(&mut control, "200 NOOP ok\r\n").await;
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    assert!(matches!(
        session.put(&missing).await,
        Err(FtpError::Transfer(TransferError::LocalFile { .. }))
    ));
    assert_eq!(session.noop().await.unwrap().code(), Some(200));
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_close_is_fatal() {
    let (config, server) = mock_server(|control| async move {
        drop(control);
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    server.await.unwrap();

    let err = session.pwd().await.unwrap_err();
    assert!(is_fatal(&err), "unexpected error kind: {}", err);
}

#[tokio::test]
async fn test_active_transfer_refused_before_connect() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.bin");
    std::fs::write(&upload, b"never sent").unwrap();
    let download = dir.path().join("report.txt");

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;

        let port_line = read_command(&mut control).await;
        assert!(port_line.starts_with("PORT "), "{}", port_line);
        send(&mut control, "200 PORT command successful\r\n").await;
        expect(&mut control, "STOR upload.bin").await;
        send(
            &mut control,
            "150 Opening data connection\r\n425 Can't open data connection\r\n",
        )
        .await;

        expect(&mut control, "NOOP").await;
        send(&mut control, "200 NOOP ok\r\n").await;

        let port_line = read_command(&mut control).await;
        assert!(port_line.starts_with("PORT "), "{}", port_line);
        send(&mut control, "200 PORT command successful\r\n").await;
        expect(&mut control, "RETR report.txt").await;
        send(&mut control, "150 Opening data connection\r\n").await;
        send(&mut control, "425 Can't open data connection\r\n").await;

        expect(&mut control, "QUIT").await;
        send(&mut control, "221 Goodbye\r\n").await;
    })
    .await;

    // Default config: no idle timeout, so only the control reply can end the wait.
    let config = ClientConfig {
        idle_timeout_secs: 0,
        ..config
    };
    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), session.pput(&upload))
        .await
        .expect("upload kept waiting for a data connection")
        .unwrap();
    assert!(!report.is_success());
    assert_eq!(report.final_reply.code(), Some(425));
    assert_eq!(report.bytes, 0);
    assert!(matches!(
        report.data_error,
        Some(TransferError::AcceptFailed(_))
    ));
    assert!(!session.control().is_transfer_pending());
    assert_eq!(session.noop().await.unwrap().code(), Some(200));

    let handle = session
        .start(
            TransferJob::download("report.txt", &download),
            TransferMode::Active,
        )
        .await
        .unwrap();
    let report = tokio::time::timeout(Duration::from_secs(5), session.finish(handle))
        .await
        .expect("download kept waiting for a data connection")
        .unwrap();
    assert_eq!(report.final_reply.code(), Some(425));
    assert!(!download.exists());
    assert!(!dir.path().join("report.txt.tmp").exists());

    session.quit().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_data_connection_reset_still_reads_final_reply() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("big.iso");

    let (config, server) = mock_server(|mut control| async move {
        expect(&mut control, "USER bob").await;
        send(&mut control, "230 Logged in\r\n").await;
        let data_listener = passive(&mut control).await;
        expect(&mut control, "RETR big.iso").await;
        let (mut data, _) = data_listener.accept().await.unwrap();
        send(&mut control, "150 Opening BINARY mode data connection\r\n").await;

        data.write_all(&[7u8; 1000]).await.unwrap();
        // Zero linger turns the close into a reset.
        #[allow(deprecated)]
        data.set_linger(Some(Duration::ZERO)).unwrap();
        drop(data);

        send(&mut control, "426 Connection closed; transfer aborted\r\n").await;
        expect(&mut control, "NOOP").await;
        send(&mut control, "200 NOOP ok\r\n").await;
    })
    .await;

    let (mut session, _) = Session::connect(config).await.unwrap();
    session.login("bob", "").await.unwrap();

    let handle = session
        .start(TransferJob::download("big.iso", &local), TransferMode::Passive)
        .await
        .unwrap();
    let report = session.finish(handle).await.unwrap();

    assert!(!report.is_success());
    assert!(matches!(report.data_error, Some(TransferError::DataIo(_))));
    assert_eq!(report.final_reply.code(), Some(426));
    assert!(!local.exists());
    assert!(!dir.path().join("big.iso.tmp").exists());

    assert_eq!(session.noop().await.unwrap().code(), Some(200));
    server.await.unwrap();
}
