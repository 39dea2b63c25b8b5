//! TCP transport — establishes the FTP control connection.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::Codec;
use crate::ftp::text::TextCodec;
use crate::ftp::types::{ClientConfig, Reply};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Establish the control connection and return a ready-to-use codec
/// **plus** the server welcome banner.
pub async fn connect(config: &ClientConfig, text: TextCodec) -> FtpResult<(Codec, Reply)> {
    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::timeout(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut codec = Codec::new(tcp, text);
    let banner = codec.read_reply().await?;
    if !banner.is_success() {
        return Err(FtpError::connection_failed(format!(
            "Server refused connection: {}",
            banner.text()
        )));
    }
    Ok((codec, banner))
}
