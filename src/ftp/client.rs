//! Stateful FTP client — owns the control connection and issues commands.
//!
//! Lifecycle: `connect()` → authenticate → FEAT probing → set TYPE →
//! optionally CWD. Exactly one data connection is active at a time, and the
//! client is never shared across tasks; higher layers thread it `&mut`.
//! Dropping the client closes the control socket on every exit path.

use crate::ftp::connection;
use crate::ftp::data;
use crate::ftp::error::{FtpError, FtpErrorKind, FtpResult};
use crate::ftp::parser;
use crate::ftp::protocol::Codec;
use crate::ftp::text::TextCodec;
use crate::ftp::types::*;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// A connected FTP session.
pub struct FtpClient {
    pub(crate) codec: Codec,
    config: ClientConfig,
    text: TextCodec,
    pub features: ServerFeatures,
    current_directory: String,
}

impl FtpClient {
    /// Establish a new FTP session.
    pub async fn connect(config: ClientConfig) -> FtpResult<Self> {
        if config.host.is_empty() {
            return Err(FtpError::invalid_config("Host must not be empty"));
        }
        let text = TextCodec::for_label(&config.encoding)?;

        let (mut codec, banner) = connection::connect(&config, text).await?;
        tracing::debug!("connected to {}: {}", config.host, banner.text());

        // ── Authenticate ─────────────────────────────────────────
        let user_reply = codec.execute(&format!("USER {}", config.username)).await?;
        if user_reply.code == 331 {
            let pass_reply = codec.execute(&format!("PASS {}", config.password)).await?;
            if !pass_reply.is_success() {
                return Err(FtpError::auth_failed(format!(
                    "Login failed: {}",
                    pass_reply.text()
                )));
            }
        } else if !user_reply.is_success() {
            return Err(FtpError::auth_failed(format!(
                "USER rejected: {}",
                user_reply.text()
            )));
        }

        // ── FEAT ─────────────────────────────────────────────────
        let features = Self::probe_features(&mut codec).await;

        // ── OPTS UTF8 ON ─────────────────────────────────────────
        if features.utf8 && text.name().eq_ignore_ascii_case("utf-8") {
            let _ = codec.execute("OPTS UTF8 ON").await;
        }

        // ── TYPE ─────────────────────────────────────────────────
        // Binary for data; path names are handled by the text codec.
        codec.expect_ok("TYPE I").await?;

        // ── PWD / initial CWD ────────────────────────────────────
        let cwd = Self::get_pwd(&mut codec).await.unwrap_or_else(|_| "/".into());
        let current_directory = if let Some(ref dir) = config.initial_directory {
            let reply = codec.execute(&format!("CWD {}", dir)).await?;
            if reply.is_success() {
                Self::get_pwd(&mut codec).await.unwrap_or_else(|_| dir.clone())
            } else {
                cwd
            }
        } else {
            cwd
        };

        Ok(Self {
            codec,
            config,
            text,
            features,
            current_directory,
        })
    }

    // ─── FEAT probe ──────────────────────────────────────────────

    async fn probe_features(codec: &mut Codec) -> ServerFeatures {
        let reply = match codec.execute("FEAT").await {
            Ok(r) if r.is_success() => r,
            _ => return ServerFeatures::default(),
        };

        let raw: Vec<String> = reply
            .lines
            .iter()
            .skip(1) // skip "211-Features:"
            .filter(|l| !l.starts_with("211"))
            .map(|l| l.trim().to_uppercase())
            .collect();

        let has = |feat: &str| raw.iter().any(|l| l.starts_with(feat));

        ServerFeatures {
            mlsd: has("MLSD"),
            size: has("SIZE"),
            rest_stream: has("REST STREAM"),
            utf8: has("UTF8"),
            epsv: has("EPSV"),
            raw_features: raw,
        }
    }

    // ─── PWD / CWD ───────────────────────────────────────────────

    /// Parse the current working directory from a PWD reply.
    async fn get_pwd(codec: &mut Codec) -> FtpResult<String> {
        let reply = codec.expect_ok("PWD").await?;
        parse_pwd(&reply.text())
    }

    /// Change into `path` and update the cached working directory.
    pub async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        self.codec.expect_ok(&format!("CWD {}", path)).await?;
        let new_pwd = Self::get_pwd(&mut self.codec).await?;
        self.current_directory = new_pwd.clone();
        Ok(new_pwd)
    }

    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    // ─── SIZE ────────────────────────────────────────────────────

    /// Get the size of a remote file (RFC 3659 SIZE).
    ///
    /// A 550 reply means the path does not exist (or is not a regular
    /// file) and maps to `NotFound`, distinct from transport errors.
    pub async fn size(&mut self, path: &str) -> FtpResult<u64> {
        let reply = self.codec.execute(&format!("SIZE {}", path)).await?;
        if reply.code == 550 {
            return Err(FtpError::not_found(format!("Remote file not found: {}", path))
                .with_code(550));
        }
        if !reply.is_completion() {
            return Err(FtpError::from_reply(reply.code, &reply.text()));
        }
        // "213 12345"
        let text = reply.text();
        let num_str = text.split_whitespace().nth(1).unwrap_or("").trim();
        num_str
            .parse::<u64>()
            .map_err(|_| FtpError::protocol_error(format!("Cannot parse SIZE: {}", text)))
    }

    // ─── MKD ─────────────────────────────────────────────────────

    /// Create a directory and all missing parents (emulated — FTP has no
    /// recursive MKD). Idempotent: segments that already exist are skipped
    /// via a CWD probe; an MKD rejection other than "already exists"
    /// surfaces as the classified error (`PermissionDenied` included).
    pub async fn mkdir_all(&mut self, path: &str) -> FtpResult<()> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();

        let mut current = String::new();
        if path.starts_with('/') {
            current.push('/');
        }

        for component in &components {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(component);

            // Try to CWD into it — if that fails, create it.
            let cwd_reply = self.codec.execute(&format!("CWD {}", current)).await?;
            if !cwd_reply.is_success() {
                let mkd_reply = self.codec.execute(&format!("MKD {}", current)).await?;
                if !mkd_reply.is_success() && mkd_reply.code != 550 {
                    return Err(FtpError::from_reply(mkd_reply.code, &mkd_reply.text()));
                }
            }
        }

        // The probe walked the working directory down the new path;
        // restore it so relative paths keep meaning what they did.
        let back = self.current_directory.clone();
        let _ = self.codec.execute(&format!("CWD {}", back)).await;
        Ok(())
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Retrieve a directory listing (prefers MLSD, falls back to LIST).
    pub async fn list_dir(&mut self, path: &str) -> FtpResult<Vec<RemoteEntry>> {
        let cmd = if self.features.mlsd {
            format!("MLSD {}", path)
        } else {
            format!("LIST {}", path)
        };
        let body = self.retrieve_data_as_string(&cmd).await?;
        Ok(parser::parse_listing(&body))
    }

    /// Open a data channel, send `cmd`, collect the body as text.
    async fn retrieve_data_as_string(&mut self, cmd: &str) -> FtpResult<String> {
        let mut stream = self.open_data_stream(cmd, 0).await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        drop(stream);
        self.finish_transfer().await?;
        Ok(self.text.decode(&buf))
    }

    // ─── Data streams ────────────────────────────────────────────

    /// Open a data connection for `cmd` (STOR/RETR/MLSD/LIST), issuing
    /// `REST <offset>` first when resuming. The caller streams on the
    /// returned socket, drops it, then reads the completion reply via
    /// [`finish_transfer`](Self::finish_transfer).
    pub(crate) async fn open_data_stream(&mut self, cmd: &str, offset: u64) -> FtpResult<TcpStream> {
        if offset > 0 && !self.features.rest_stream {
            return Err(FtpError::protocol_error(
                "Server does not support REST STREAM; cannot resume",
            ));
        }

        let stream = data::open_data_channel(
            &mut self.codec,
            &self.config.host,
            self.features.epsv,
            Duration::from_secs(self.config.data_timeout_sec),
        )
        .await?;

        // REST applies to the next transfer command, so it goes out after
        // the data channel is arranged and immediately before `cmd`.
        if offset > 0 {
            let reply = self.codec.execute(&format!("REST {}", offset)).await?;
            if !reply.is_intermediate() {
                return Err(FtpError::protocol_error(format!(
                    "REST {} rejected: {}",
                    offset,
                    reply.text()
                )));
            }
        }

        let reply = self.codec.execute(cmd).await?;
        if !reply.is_preliminary() && !reply.is_success() {
            return Err(FtpError::from_reply(reply.code, &reply.text()));
        }
        Ok(stream)
    }

    /// Read the transfer-complete reply (226) after the data channel closed.
    pub(crate) async fn finish_transfer(&mut self) -> FtpResult<()> {
        let done = self.codec.read_reply().await?;
        if !done.is_success() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    // ─── Remote path classification ──────────────────────────────

    /// Best-effort classification of a remote path: CWD success means
    /// directory, a SIZE answer means file, neither means the path does
    /// not exist.
    pub async fn classify(&mut self, path: &str) -> FtpResult<EntryKind> {
        let reply = self.codec.execute(&format!("CWD {}", path)).await?;
        if reply.is_success() {
            let back = self.current_directory.clone();
            let _ = self.codec.execute(&format!("CWD {}", back)).await;
            return Ok(EntryKind::Directory);
        }
        match self.size(path).await {
            Ok(_) => Ok(EntryKind::File),
            Err(e) if e.kind == FtpErrorKind::NotFound => Err(FtpError::not_found(format!(
                "Remote path not found: {}",
                path
            ))),
            Err(e) => Err(e),
        }
    }

    // ─── QUIT ────────────────────────────────────────────────────

    /// Gracefully close the session. The socket itself is released on
    /// drop regardless.
    pub async fn quit(&mut self) -> FtpResult<()> {
        let _ = self.codec.execute("QUIT").await;
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Parse `257 "/some/path"` into the path string.
fn parse_pwd(text: &str) -> FtpResult<String> {
    if let Some(start) = text.find('"') {
        if let Some(end) = text[start + 1..].find('"') {
            return Ok(text[start + 1..start + 1 + end].to_string());
        }
    }
    Err(FtpError::protocol_error(format!("Cannot parse PWD: {}", text)))
}
