//! Async FTP client.
//!
//! Layering, bottom up:
//! - `text` / `rpath`: path-name encoding and remote path arithmetic
//! - `protocol` / `connection`: control-channel codec and session setup
//! - `data`: passive-mode data channels (PASV/EPSV)
//! - `parser`: MLSD and legacy LIST parsing into [`RemoteEntry`]
//! - `client`: the stateful session ([`FtpClient`])
//! - `file_ops`: resumable single-file transfers
//! - `mirror`: recursive directory mirroring with a bounded work list
//! - `explorer`: read-only ls/tree/find rendering
//! - `progress`: throttled transfer progress lines

pub mod client;
pub mod connection;
pub mod data;
pub mod error;
pub mod explorer;
pub mod file_ops;
pub mod mirror;
pub mod parser;
pub mod progress;
pub mod protocol;
pub mod rpath;
pub mod text;
pub mod types;

pub use client::FtpClient;
pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use types::*;
