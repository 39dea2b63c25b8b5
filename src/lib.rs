//! Resumable FTP transfers and remote directory inspection.

pub mod cli;
pub mod config;
pub mod ftp;
