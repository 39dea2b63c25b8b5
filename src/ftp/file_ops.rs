//! File-level operations — resumable upload and download.
//!
//! The resume policy is deliberate: a destination that already covers the
//! source is success, not an error, so re-running a transfer always
//! converges without duplicating data. FTP offers no cheap content
//! verification, so equality of sizes is the whole contract.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpErrorKind, FtpResult};
use crate::ftp::progress::ProgressReporter;
use crate::ftp::rpath;
use crate::ftp::types::{TransferDirection, TransferOutcome};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Chunk size for streaming transfers (64 KiB).
const CHUNK_SIZE: usize = 65_536;

/// How a transfer should proceed given the two endpoint sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Destination already covers the source.
    Skip,
    /// Stream from this byte offset.
    Start(u64),
}

/// Pure resume policy, shared by both directions.
///
/// `dest_size` is `None` when the destination does not exist.
pub fn plan_transfer(source_size: u64, dest_size: Option<u64>) -> ResumePlan {
    match dest_size {
        None => ResumePlan::Start(0),
        Some(dest) if dest < source_size => ResumePlan::Start(dest),
        Some(_) => ResumePlan::Skip,
    }
}

impl FtpClient {
    // ─── UPLOAD (STOR) ───────────────────────────────────────────

    /// Upload one local file, resuming a partial prior attempt when safe.
    ///
    /// On mid-stream failure the error carries the number of bytes sent in
    /// this run; the next attempt recomputes the offset from the remote
    /// size, so no automatic retry is needed here.
    pub async fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome> {
        let meta = fs::metadata(local)
            .await
            .map_err(|_| FtpError::not_found(format!("Local file not found: {}", local.display())))?;
        if !meta.is_file() {
            return Err(FtpError::not_found(format!(
                "Not a regular file: {}",
                local.display()
            )));
        }
        let local_size = meta.len();

        let remote_size = match self.size(remote).await {
            Ok(n) => Some(n),
            Err(e) if e.kind == FtpErrorKind::NotFound => None,
            // SIZE unsupported: treat as absent and upload fresh.
            Err(e) if e.kind == FtpErrorKind::CommandRejected => None,
            Err(e) => return Err(e),
        };

        let offset = match plan_transfer(local_size, remote_size) {
            ResumePlan::Skip => {
                tracing::info!("{} already complete on server, skipping", remote);
                return Ok(TransferOutcome::Skipped);
            }
            ResumePlan::Start(o) => o,
        };

        if let Some(parent) = rpath::parent(remote) {
            if !parent.is_empty() && parent != "/" {
                self.mkdir_all(parent).await?;
            }
        }

        if offset > 0 {
            tracing::info!("resuming upload of {} at byte {}", remote, offset);
        }

        let mut file = fs::File::open(local).await?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        let mut stream = self
            .open_data_stream(&format!("STOR {}", remote), offset)
            .await?;

        let name = rpath::file_name(remote).unwrap_or(remote);
        reporter.begin(name, TransferDirection::Upload, Some(local_size), offset);

        let mut sent = offset;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            stream.write_all(&buf[..n]).await.map_err(|e| {
                FtpError::transfer_failed(format!(
                    "Upload of {} failed after {} bytes: {}",
                    remote,
                    sent - offset,
                    e
                ))
            })?;
            sent += n as u64;
            reporter.update(sent);
        }
        stream.flush().await?;
        stream.shutdown().await?;
        drop(stream);

        self.finish_transfer().await?;
        reporter.finish(sent);

        if sent != local_size {
            return Err(FtpError::transfer_failed(format!(
                "Short upload of {}: {} of {} bytes",
                remote, sent, local_size
            )));
        }
        Ok(TransferOutcome::Transferred {
            bytes: sent - offset,
        })
    }

    // ─── DOWNLOAD (RETR) ─────────────────────────────────────────

    /// Download one remote file, resuming from the local size when the
    /// local file is a shorter prefix. A missing remote file is `NotFound`.
    pub async fn download_file(
        &mut self,
        remote: &str,
        local: &Path,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome> {
        let remote_size = match self.size(remote).await {
            Ok(n) => Some(n),
            // SIZE unsupported: size unknown, download fresh.
            Err(e) if e.kind == FtpErrorKind::CommandRejected => None,
            Err(e) => return Err(e),
        };

        let local_size = match fs::metadata(local).await {
            Ok(m) if m.is_file() => Some(m.len()),
            _ => None,
        };

        let offset = match remote_size {
            Some(remote_len) => match plan_transfer(remote_len, local_size) {
                ResumePlan::Skip => {
                    tracing::info!("{} already complete locally, skipping", local.display());
                    return Ok(TransferOutcome::Skipped);
                }
                ResumePlan::Start(o) => o,
            },
            // Without a remote size resume cannot be validated; restart.
            None => 0,
        };

        if let Some(parent) = local.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = if offset > 0 {
            tracing::info!("resuming download of {} at byte {}", remote, offset);
            fs::OpenOptions::new().append(true).open(local).await?
        } else {
            fs::File::create(local).await?
        };

        let mut stream = self
            .open_data_stream(&format!("RETR {}", remote), offset)
            .await?;

        let name = rpath::file_name(remote).unwrap_or(remote);
        reporter.begin(name, TransferDirection::Download, remote_size, offset);

        let mut received = offset;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = stream.read(&mut buf).await.map_err(|e| {
                FtpError::transfer_failed(format!(
                    "Download of {} failed after {} bytes: {}",
                    remote,
                    received - offset,
                    e
                ))
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            received += n as u64;
            reporter.update(received);
        }
        file.flush().await?;
        drop(file);
        drop(stream);

        self.finish_transfer().await?;
        reporter.finish(received);

        if let Some(remote_len) = remote_size {
            if received != remote_len {
                return Err(FtpError::transfer_failed(format!(
                    "Short download of {}: {} of {} bytes",
                    remote, received, remote_len
                )));
            }
        }
        Ok(TransferOutcome::Transferred {
            bytes: received - offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_when_destination_absent() {
        assert_eq!(plan_transfer(100, None), ResumePlan::Start(0));
    }

    #[test]
    fn resumes_from_partial_destination() {
        assert_eq!(plan_transfer(100, Some(40)), ResumePlan::Start(40));
        assert_eq!(plan_transfer(100, Some(99)), ResumePlan::Start(99));
    }

    #[test]
    fn skips_when_destination_covers_source() {
        assert_eq!(plan_transfer(100, Some(100)), ResumePlan::Skip);
        // Oversized destination still counts as covered; FTP gives us no
        // cheap way to verify content, so we never re-send.
        assert_eq!(plan_transfer(100, Some(150)), ResumePlan::Skip);
    }

    #[test]
    fn zero_byte_source() {
        assert_eq!(plan_transfer(0, None), ResumePlan::Start(0));
        assert_eq!(plan_transfer(0, Some(0)), ResumePlan::Skip);
    }
}
