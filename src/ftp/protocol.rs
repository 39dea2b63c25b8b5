//! Low-level FTP command/reply codec (RFC 959 §4).
//!
//! Handles:
//! - Sending FTP commands terminated with `\r\n`, encoded per the
//!   configured text codec
//! - Reading single-line and multi-line replies
//! - Parsing the 3-digit reply code

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::text::TextCodec;
use crate::ftp::types::Reply;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// The FTP command/reply codec operating on the split control stream.
pub struct Codec {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    text: TextCodec,
}

impl Codec {
    /// Create a codec from a freshly connected control stream.
    pub fn new(stream: TcpStream, text: TextCodec) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            reader: BufReader::new(rd),
            writer: wr,
            text,
        }
    }

    /// Send a raw FTP command (without trailing CRLF — we add it).
    pub async fn send_command(&mut self, cmd: &str) -> FtpResult<()> {
        let mut line = self.text.encode(cmd);
        line.extend_from_slice(b"\r\n");
        self.writer.write_all(&line).await?;
        tracing::trace!(">>> {}", redact(cmd));
        Ok(())
    }

    /// Read a single line from the control channel.
    async fn read_line_raw(&mut self) -> FtpResult<String> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Err(FtpError::disconnected("Server closed connection"));
        }
        Ok(self.text.decode(&buf))
    }

    /// Read a complete FTP reply (possibly multi-line).
    ///
    /// Multi-line replies look like:
    /// ```text
    /// 220-Welcome to my FTP server
    /// 220-This is line 2
    /// 220 End of greeting
    /// ```
    pub async fn read_reply(&mut self) -> FtpResult<Reply> {
        let first = self.read_line_raw().await?;
        let first_trimmed = first.trim_end_matches(['\r', '\n']);

        if first_trimmed.len() < 3 {
            return Err(FtpError::protocol_error(format!(
                "Reply too short: '{}'",
                first_trimmed
            )));
        }

        let code = parse_code(first_trimmed)?;
        let mut lines = vec![first_trimmed.to_string()];

        // Multi-line: "NNN-" means more lines follow until "NNN " is seen.
        let is_multi = first_trimmed.len() >= 4 && first_trimmed.as_bytes()[3] == b'-';
        if is_multi {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line_raw().await?;
                let next_trimmed = next.trim_end_matches(['\r', '\n']);
                lines.push(next_trimmed.to_string());
                if next_trimmed.starts_with(&terminator) {
                    break;
                }
            }
        }

        let reply = Reply { code, lines };
        tracing::trace!(
            "<<< {} {}",
            reply.code,
            reply.lines.last().map(String::as_str).unwrap_or("")
        );
        Ok(reply)
    }

    /// Send a command and return the reply.
    pub async fn execute(&mut self, cmd: &str) -> FtpResult<Reply> {
        self.send_command(cmd).await?;
        self.read_reply().await
    }

    /// Send a command, expect a specific reply-code class.
    pub async fn expect(&mut self, cmd: &str, expected_first_digit: u16) -> FtpResult<Reply> {
        let reply = self.execute(cmd).await?;
        if reply.code / 100 != expected_first_digit {
            return Err(FtpError::from_reply(reply.code, &reply.text()));
        }
        Ok(reply)
    }

    /// Expect a 2xx reply.
    pub async fn expect_ok(&mut self, cmd: &str) -> FtpResult<Reply> {
        self.expect(cmd, 2).await
    }
}

/// Parse the 3-digit reply code from the start of a line.
fn parse_code(line: &str) -> FtpResult<u16> {
    if line.len() < 3 {
        return Err(FtpError::protocol_error("Reply too short to contain code"));
    }
    line[..3]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error(format!("Invalid reply code in: '{}'", line)))
}

/// Keep passwords out of the trace log.
fn redact(cmd: &str) -> &str {
    if cmd.starts_with("PASS ") {
        "PASS ******"
    } else {
        cmd
    }
}
