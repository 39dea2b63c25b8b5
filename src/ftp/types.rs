//! Shared types for the FTP client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ─── Connection ──────────────────────────────────────────────────────

/// Configuration for a single FTP connection.
///
/// Built once per invocation by the CLI layer and never mutated after the
/// session opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Text encoding for path names on the control channel
    /// (any `encoding_rs` label, e.g. "utf-8", "gbk").
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Remote directory to CWD into after login.
    #[serde(default)]
    pub initial_directory: Option<String>,
    /// Control-connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Data-channel timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
}

fn default_port() -> u16 {
    21
}
fn default_username() -> String {
    "anonymous".into()
}
fn default_password() -> String {
    "anonymous@".into()
}
fn default_encoding() -> String {
    "utf-8".into()
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_data_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: default_username(),
            password: default_password(),
            encoding: default_encoding(),
            initial_directory: None,
            connect_timeout_sec: default_connect_timeout(),
            data_timeout_sec: default_data_timeout(),
        }
    }
}

// ─── Directory listing ───────────────────────────────────────────────

/// Type of a remote filesystem entry.
///
/// `Unknown` is a real state, not a parse failure placeholder: legacy LIST
/// output cannot always be classified, and callers must decide what to do
/// with such entries instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Unknown,
}

/// One entry from a directory listing (parsed from LIST or MLSD output).
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes when the listing reports one.
    pub size: Option<u64>,
    /// Modification date as the server printed it, for display only.
    pub modified: Option<String>,
    /// Raw line from the server, kept for diagnostics.
    pub raw: Option<String>,
}

// ─── FTP replies ─────────────────────────────────────────────────────

/// A single FTP reply (may be multi-line).
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    /// Full reply text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the reply code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether this is a positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

/// Parsed FEAT reply — the subset of capabilities this client acts on.
#[derive(Debug, Clone, Default)]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub size: bool,
    pub rest_stream: bool,
    pub utf8: bool,
    pub epsv: bool,
    pub raw_features: Vec<String>,
}

// ─── Transfers ───────────────────────────────────────────────────────

/// Direction of a file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl TransferDirection {
    /// Short label used in progress lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "put",
            Self::Download => "get",
        }
    }
}

/// Result of one file-level transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Bytes actually moved in this run (excludes any resumed prefix).
    Transferred { bytes: u64 },
    /// Destination already covered the source; nothing was sent.
    Skipped,
}

/// Progress snapshot emitted during a single file's transfer.
#[derive(Debug, Clone)]
pub struct ProgressSample {
    pub file_name: String,
    pub direction: TransferDirection,
    pub transferred: u64,
    /// Unknown when the server cannot report a size.
    pub total: Option<u64>,
}

// ─── Traversal ───────────────────────────────────────────────────────

/// One unit of pending recursive work: a remote/local directory pair plus
/// the depth at which it sits. Owned exclusively by the work list of the
/// traversal that created it.
#[derive(Debug, Clone)]
pub struct TraversalFrame {
    pub remote: String,
    pub local: PathBuf,
    pub depth: u32,
}

/// Counters accumulated while a traversal's work list drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub transferred: u64,
    pub skipped: u64,
    pub failed: u64,
    pub truncated: u64,
}

impl MirrorSummary {
    /// True when every frame completed without error or truncation.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.truncated == 0
    }
}

impl fmt::Display for MirrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transferred, {} skipped, {} failed, {} truncated branches",
            self.transferred, self.skipped, self.failed, self.truncated
        )
    }
}
