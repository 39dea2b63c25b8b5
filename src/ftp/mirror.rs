//! Recursive directory mirroring.
//!
//! Traversal uses an explicit work list instead of the call stack, so a
//! hostile or looping remote tree can never overflow the stack; depth is
//! bounded by [`MAX_MIRROR_DEPTH`] and overflow branches are counted, not
//! fatal. One failed branch marks itself failed and the walk continues,
//! so a mirror run always produces a full [`MirrorSummary`].

use crate::ftp::client::FtpClient;
use crate::ftp::error::FtpResult;
use crate::ftp::explorer::RemoteLister;
use crate::ftp::progress::ProgressReporter;
use crate::ftp::rpath;
use crate::ftp::types::{EntryKind, MirrorSummary, TransferOutcome, TraversalFrame};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

/// Depth ceiling for mirror traversal.
pub const MAX_MIRROR_DEPTH: u32 = 50;

/// Everything the mirror engine needs from a session. `FtpClient`
/// implements it; tests substitute an in-memory server.
#[async_trait]
pub trait TransferBackend: RemoteLister {
    async fn ensure_dir(&mut self, remote: &str) -> FtpResult<()>;
    async fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome>;
    async fn download_file(
        &mut self,
        remote: &str,
        local: &Path,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome>;
}

#[async_trait]
impl TransferBackend for FtpClient {
    async fn ensure_dir(&mut self, remote: &str) -> FtpResult<()> {
        self.mkdir_all(remote).await
    }

    async fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome> {
        FtpClient::upload_file(self, local, remote, reporter).await
    }

    async fn download_file(
        &mut self,
        remote: &str,
        local: &Path,
        reporter: &mut ProgressReporter,
    ) -> FtpResult<TransferOutcome> {
        FtpClient::download_file(self, remote, local, reporter).await
    }
}

// ─── UPLOAD ──────────────────────────────────────────────────────────

/// Mirror a local directory tree to the server.
///
/// Every file goes through the same resume policy as a single-file
/// upload, so a re-run after interruption skips complete files and
/// resumes partial ones.
pub async fn upload_tree<B: TransferBackend + Send>(
    backend: &mut B,
    local_root: &Path,
    remote_root: &str,
    reporter: &mut ProgressReporter,
) -> FtpResult<MirrorSummary> {
    let mut summary = MirrorSummary::default();
    let mut work = vec![TraversalFrame {
        remote: remote_root.trim_end_matches('/').to_string(),
        local: local_root.to_path_buf(),
        depth: 0,
    }];

    while let Some(frame) = work.pop() {
        if frame.depth > MAX_MIRROR_DEPTH {
            tracing::warn!(
                "depth limit {} exceeded, not descending into {}",
                MAX_MIRROR_DEPTH,
                frame.local.display()
            );
            summary.truncated += 1;
            continue;
        }

        if let Err(e) = backend.ensure_dir(&frame.remote).await {
            tracing::error!("cannot create {}: {}", frame.remote, e);
            summary.failed += 1;
            continue;
        }

        let (files, dirs) = match read_local_dir(&frame.local).await {
            Ok(split) => split,
            Err(e) => {
                tracing::error!("cannot read {}: {}", frame.local.display(), e);
                summary.failed += 1;
                continue;
            }
        };

        for name in files {
            let local = frame.local.join(&name);
            let remote = rpath::join(&frame.remote, &name);
            match backend.upload_file(&local, &remote, reporter).await {
                Ok(TransferOutcome::Transferred { .. }) => summary.transferred += 1,
                Ok(TransferOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::error!("upload {} failed: {}", remote, e);
                    summary.failed += 1;
                }
            }
        }

        for name in dirs {
            work.push(TraversalFrame {
                remote: rpath::join(&frame.remote, &name),
                local: frame.local.join(&name),
                depth: frame.depth + 1,
            });
        }
    }

    Ok(summary)
}

/// Split one local directory into sorted file and directory names.
/// Symlinks and other special files are skipped with a warning.
async fn read_local_dir(dir: &Path) -> std::io::Result<(Vec<String>, Vec<String>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().await?;
        if file_type.is_file() {
            files.push(name);
        } else if file_type.is_dir() {
            dirs.push(name);
        } else {
            tracing::warn!("skipping special file {}", entry.path().display());
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

// ─── DOWNLOAD ────────────────────────────────────────────────────────

/// Mirror a remote directory tree to local disk.
pub async fn download_tree<B: TransferBackend + Send>(
    backend: &mut B,
    remote_root: &str,
    local_root: &Path,
    reporter: &mut ProgressReporter,
) -> FtpResult<MirrorSummary> {
    let mut summary = MirrorSummary::default();
    let mut work = vec![TraversalFrame {
        remote: remote_root.trim_end_matches('/').to_string(),
        local: local_root.to_path_buf(),
        depth: 0,
    }];

    while let Some(frame) = work.pop() {
        if frame.depth > MAX_MIRROR_DEPTH {
            tracing::warn!(
                "depth limit {} exceeded, not descending into {}",
                MAX_MIRROR_DEPTH,
                frame.remote
            );
            summary.truncated += 1;
            continue;
        }

        if let Err(e) = fs::create_dir_all(&frame.local).await {
            tracing::error!("cannot create {}: {}", frame.local.display(), e);
            summary.failed += 1;
            continue;
        }

        let mut entries = match backend.list_dir(&frame.remote).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("cannot list {}: {}", frame.remote, e);
                summary.failed += 1;
                continue;
            }
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in entries {
            let remote = rpath::join(&frame.remote, &entry.name);
            match entry.kind {
                EntryKind::File => {
                    let local = frame.local.join(&entry.name);
                    match backend.download_file(&remote, &local, reporter).await {
                        Ok(TransferOutcome::Transferred { .. }) => summary.transferred += 1,
                        Ok(TransferOutcome::Skipped) => summary.skipped += 1,
                        Err(e) => {
                            tracing::error!("download {} failed: {}", remote, e);
                            summary.failed += 1;
                        }
                    }
                }
                EntryKind::Directory => {
                    work.push(TraversalFrame {
                        remote,
                        local: frame.local.join(&entry.name),
                        depth: frame.depth + 1,
                    });
                }
                EntryKind::Unknown => {
                    // Never descend into something we cannot classify.
                    tracing::warn!("skipping ambiguous entry {}", remote);
                    summary.skipped += 1;
                }
            }
        }
    }

    Ok(summary)
}
