//! End-to-end session tests against a scripted in-process FTP server.
//!
//! The server speaks just enough RFC 959 for one client session at a
//! time: PASV data channels, MLSD listings, SIZE, and REST-based
//! resumption for STOR and RETR.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use ftpcmd::ftp::progress::ProgressReporter;
use ftpcmd::ftp::types::{ClientConfig, EntryKind, TransferOutcome};
use ftpcmd::ftp::{FtpClient, FtpErrorKind};

// ─── Scripted server ─────────────────────────────────────────────────

#[derive(Debug)]
struct StoredUpload {
    path: String,
    offset: u64,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct ServerState {
    files: HashMap<String, Vec<u8>>,
    dirs: Vec<String>,
    stored: Vec<StoredUpload>,
}

async fn spawn_server(state: ServerState) -> (SocketAddr, Arc<Mutex<ServerState>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(Mutex::new(state));
    let handle_state = state.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let _ = serve_session(stream, handle_state.clone()).await;
        }
    });
    (addr, state)
}

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

async fn serve_session(stream: TcpStream, state: Arc<Mutex<ServerState>>) -> std::io::Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut reader = BufReader::new(rd);
    wr.write_all(b"220 scripted server ready\r\n").await?;

    let mut rest: u64 = 0;
    let mut data: Option<TcpListener> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let cmd = line.trim_end();
        let (verb, arg) = match cmd.split_once(' ') {
            Some((v, a)) => (v, a),
            None => (cmd, ""),
        };

        match verb {
            "USER" => wr.write_all(b"331 password required\r\n").await?,
            "PASS" => wr.write_all(b"230 logged in\r\n").await?,
            "FEAT" => {
                wr.write_all(
                    b"211-Features:\r\n MLSD\r\n SIZE\r\n REST STREAM\r\n211 End\r\n",
                )
                .await?
            }
            "TYPE" => wr.write_all(b"200 type set\r\n").await?,
            "OPTS" => wr.write_all(b"200 ok\r\n").await?,
            "PWD" => wr.write_all(b"257 \"/\" is current directory\r\n").await?,
            "CWD" => {
                let st = state.lock().await;
                if arg == "/" || st.dirs.iter().any(|d| d == arg) {
                    wr.write_all(b"250 directory changed\r\n").await?;
                } else {
                    wr.write_all(b"550 No such directory\r\n").await?;
                }
            }
            "SIZE" => {
                let st = state.lock().await;
                match st.files.get(arg) {
                    Some(body) => {
                        wr.write_all(format!("213 {}\r\n", body.len()).as_bytes())
                            .await?
                    }
                    None => wr.write_all(b"550 No such file\r\n").await?,
                }
            }
            "REST" => {
                rest = arg.parse().unwrap_or(0);
                wr.write_all(format!("350 restarting at {}\r\n", rest).as_bytes())
                    .await?;
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                wr.write_all(
                    format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                        port / 256,
                        port % 256
                    )
                    .as_bytes(),
                )
                .await?;
                data = Some(listener);
            }
            "MLSD" => {
                let listener = match data.take() {
                    Some(l) => l,
                    None => {
                        wr.write_all(b"425 no data connection\r\n").await?;
                        continue;
                    }
                };
                wr.write_all(b"150 listing follows\r\n").await?;
                let (mut conn, _) = listener.accept().await?;
                let st = state.lock().await;
                let dir = arg.trim_end_matches('/');
                let dir = if dir.is_empty() { "/" } else { dir };
                for (path, body) in &st.files {
                    if parent_of(path) == dir {
                        let entry =
                            format!("type=file;size={}; {}\r\n", body.len(), base_name(path));
                        conn.write_all(entry.as_bytes()).await?;
                    }
                }
                for sub in &st.dirs {
                    if parent_of(sub) == dir {
                        conn.write_all(format!("type=dir; {}\r\n", base_name(sub)).as_bytes())
                            .await?;
                    }
                }
                drop(conn);
                wr.write_all(b"226 done\r\n").await?;
            }
            "RETR" => {
                let listener = match data.take() {
                    Some(l) => l,
                    None => {
                        wr.write_all(b"425 no data connection\r\n").await?;
                        continue;
                    }
                };
                let body = {
                    let st = state.lock().await;
                    st.files.get(arg).cloned()
                };
                match body {
                    Some(body) => {
                        wr.write_all(b"150 sending\r\n").await?;
                        let (mut conn, _) = listener.accept().await?;
                        let start = (rest as usize).min(body.len());
                        conn.write_all(&body[start..]).await?;
                        drop(conn);
                        rest = 0;
                        wr.write_all(b"226 done\r\n").await?;
                    }
                    None => wr.write_all(b"550 No such file\r\n").await?,
                }
            }
            "STOR" => {
                let listener = match data.take() {
                    Some(l) => l,
                    None => {
                        wr.write_all(b"425 no data connection\r\n").await?;
                        continue;
                    }
                };
                wr.write_all(b"150 receiving\r\n").await?;
                let (mut conn, _) = listener.accept().await?;
                let mut body = Vec::new();
                conn.read_to_end(&mut body).await?;
                drop(conn);

                let mut st = state.lock().await;
                let mut full = st
                    .files
                    .get(arg)
                    .map(|existing| existing[..(rest as usize).min(existing.len())].to_vec())
                    .unwrap_or_default();
                full.extend_from_slice(&body);
                st.files.insert(arg.to_string(), full);
                st.stored.push(StoredUpload {
                    path: arg.to_string(),
                    offset: rest,
                    body,
                });
                rest = 0;
                wr.write_all(b"226 done\r\n").await?;
            }
            "QUIT" => {
                wr.write_all(b"221 bye\r\n").await?;
                break;
            }
            _ => wr.write_all(b"502 not implemented\r\n").await?,
        }
    }
    Ok(())
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "tester".into(),
        password: "secret".into(),
        ..Default::default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_probes_features_and_answers_size() {
    let mut state = ServerState::default();
    state.files.insert("/a.bin".into(), vec![7u8; 1234]);
    let (addr, _) = spawn_server(state).await;

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    assert!(client.features.mlsd);
    assert!(client.features.rest_stream);
    assert!(!client.features.epsv);

    assert_eq!(client.size("/a.bin").await.unwrap(), 1234);
    let err = client.size("/missing.bin").await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NotFound);
    client.quit().await.unwrap();
}

#[tokio::test]
async fn upload_resumes_from_remote_size() {
    let local_body: Vec<u8> = (0..100u8).collect();

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("up.bin");
    std::fs::write(&local, &local_body).unwrap();

    // Server already holds the first 40 bytes from an earlier attempt.
    let mut state = ServerState::default();
    state.files.insert("/up.bin".into(), local_body[..40].to_vec());
    let (addr, state) = spawn_server(state).await;

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut reporter = ProgressReporter::disabled();
    let outcome = client
        .upload_file(&local, "/up.bin", &mut reporter)
        .await
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Transferred { bytes: 60 });
    client.quit().await.unwrap();

    let st = state.lock().await;
    assert_eq!(st.stored.len(), 1);
    assert_eq!(st.stored[0].offset, 40);
    assert_eq!(st.stored[0].body, local_body[40..].to_vec());
    assert_eq!(st.files["/up.bin"], local_body);
}

#[tokio::test]
async fn upload_skips_when_remote_already_complete() {
    let body = vec![3u8; 64];

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("same.bin");
    std::fs::write(&local, &body).unwrap();

    let mut state = ServerState::default();
    state.files.insert("/same.bin".into(), body);
    let (addr, state) = spawn_server(state).await;

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut reporter = ProgressReporter::disabled();
    let outcome = client
        .upload_file(&local, "/same.bin", &mut reporter)
        .await
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Skipped);
    client.quit().await.unwrap();

    assert!(state.lock().await.stored.is_empty());
}

#[tokio::test]
async fn download_fetches_fresh_file() {
    let body: Vec<u8> = (0..=255u8).cycle().take(500).collect();
    let mut state = ServerState::default();
    state.files.insert("/d.bin".into(), body.clone());
    let (addr, _) = spawn_server(state).await;

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("d.bin");

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut reporter = ProgressReporter::disabled();
    let outcome = client
        .download_file("/d.bin", &local, &mut reporter)
        .await
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Transferred { bytes: 500 });
    client.quit().await.unwrap();

    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn download_resumes_from_local_size() {
    let body: Vec<u8> = (0..100u8).collect();
    let mut state = ServerState::default();
    state.files.insert("/r.bin".into(), body.clone());
    let (addr, _) = spawn_server(state).await;

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("r.bin");
    std::fs::write(&local, &body[..40]).unwrap();

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut reporter = ProgressReporter::disabled();
    let outcome = client
        .download_file("/r.bin", &local, &mut reporter)
        .await
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Transferred { bytes: 60 });
    client.quit().await.unwrap();

    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn download_skips_when_local_already_complete() {
    let body = vec![9u8; 80];
    let mut state = ServerState::default();
    state.files.insert("/done.bin".into(), body.clone());
    let (addr, _) = spawn_server(state).await;

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("done.bin");
    std::fs::write(&local, &body).unwrap();

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut reporter = ProgressReporter::disabled();
    let outcome = client
        .download_file("/done.bin", &local, &mut reporter)
        .await
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Skipped);
    client.quit().await.unwrap();
}

#[tokio::test]
async fn list_dir_parses_mlsd_listing() {
    let mut state = ServerState::default();
    state.files.insert("/pub/a.txt".into(), vec![1u8; 10]);
    state.files.insert("/pub/b.txt".into(), vec![1u8; 20]);
    state.dirs.push("/pub".into());
    state.dirs.push("/pub/sub".into());
    let (addr, _) = spawn_server(state).await;

    let mut client = FtpClient::connect(config_for(addr)).await.unwrap();
    let mut entries = client.list_dir("/pub").await.unwrap();
    client.quit().await.unwrap();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].kind, EntryKind::File);
    assert_eq!(entries[0].size, Some(10));
    assert_eq!(entries[1].name, "b.txt");
    assert_eq!(entries[2].name, "sub");
    assert_eq!(entries[2].kind, EntryKind::Directory);
}
