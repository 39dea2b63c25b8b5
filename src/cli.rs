//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ftpcmd",
    version,
    about = "Resumable FTP transfers and remote directory inspection"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// FTP server host name or address.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Control connection port.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Login user name.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Login password.
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Path name encoding on the wire (e.g. utf-8, gbk).
    #[arg(long, global = true)]
    pub encoding: Option<String>,

    /// Explicit configuration file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Exit non-zero when a mirror run has failed branches.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log level filter when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a local file or directory to the server.
    Put {
        /// Local file or directory to send.
        local: PathBuf,

        /// Remote destination path; defaults to the local base name
        /// under the configured base directory.
        #[arg(long)]
        remote: Option<String>,
    },

    /// Download a remote file or directory from the server.
    Get {
        /// Remote file or directory to fetch.
        remote: String,

        /// Local destination path; defaults to the remote base name.
        #[arg(long)]
        local: Option<PathBuf>,
    },

    /// List one remote directory.
    Ls {
        /// Remote directory; defaults to the configured base directory.
        remote: Option<String>,
    },

    /// Render a remote directory tree.
    Tree {
        /// Remote directory; defaults to the configured base directory.
        remote: Option<String>,

        /// Recursion ceiling.
        #[arg(long, default_value_t = crate::ftp::explorer::TREE_MAX_DEPTH)]
        max_depth: u32,
    },

    /// Recursively enumerate remote files and directories.
    Find {
        /// Remote directory; defaults to the configured base directory.
        remote: Option<String>,

        /// Recursion ceiling.
        #[arg(long, default_value_t = crate::ftp::explorer::FIND_MAX_DEPTH)]
        max_depth: u32,
    },
}
