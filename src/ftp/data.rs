//! Data-channel establishment.
//!
//! One transient TCP connection per directory listing or file transfer,
//! opened in passive mode: `PASV` (RFC 959) by default, `EPSV` (RFC 2428)
//! when the server advertises it. Active mode is out of scope.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::Codec;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

/// Open a data channel, preferring EPSV when advertised.
pub async fn open_data_channel(
    codec: &mut Codec,
    host: &str,
    use_epsv: bool,
    data_timeout: Duration,
) -> FtpResult<TcpStream> {
    if use_epsv {
        open_epsv(codec, host, data_timeout).await
    } else {
        open_pasv(codec, data_timeout).await
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the reply, connect to the returned address.
///
/// Reply format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(codec: &mut Codec, data_timeout: Duration) -> FtpResult<TcpStream> {
    let reply = codec.expect_ok("PASV").await?;
    let addr = parse_pasv_reply(&reply.text())?;
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| FtpError::data_channel("PASV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 reply.
fn parse_pasv_reply(text: &str) -> FtpResult<SocketAddr> {
    let re = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

// ─── EPSV ────────────────────────────────────────────────────────────

/// Issue `EPSV`, parse the port, connect to the *same host* on that port.
///
/// Reply format: `229 Entering Extended Passive Mode (|||port|)`
async fn open_epsv(codec: &mut Codec, host: &str, data_timeout: Duration) -> FtpResult<TcpStream> {
    let reply = codec.expect_ok("EPSV").await?;
    let port = parse_epsv_reply(&reply.text())?;
    let addr = format!("{}:{}", host, port);
    let tcp = timeout(data_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::data_channel("EPSV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("EPSV data connect: {}", e)))?;
    Ok(tcp)
}

fn parse_epsv_reply(text: &str) -> FtpResult<u16> {
    let re = Regex::new(r"\|\|\|(\d+)\|").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse EPSV: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error("EPSV port out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pasv_reply_parses() {
        let addr = parse_pasv_reply("227 Entering Passive Mode (192,168,1,10,19,136)").unwrap();
        assert_eq!(addr.to_string(), "192.168.1.10:5000");
    }

    #[test]
    fn pasv_reply_rejects_garbage() {
        assert!(parse_pasv_reply("227 whatever").is_err());
        assert!(parse_pasv_reply("227 (300,1,1,1,1,1)").is_err());
    }

    #[test]
    fn epsv_reply_parses() {
        assert_eq!(
            parse_epsv_reply("229 Entering Extended Passive Mode (|||6446|)").unwrap(),
            6446
        );
        assert!(parse_epsv_reply("229 nope").is_err());
    }
}
