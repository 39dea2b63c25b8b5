//! Configuration loading and layering.
//!
//! Precedence, highest first: command-line flags, the JSON configuration
//! file, built-in defaults. The file is looked up at an explicit
//! `--config` path, then `./config.json`, then the per-user
//! configuration directory.

use crate::cli::Cli;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::text::TextCodec;
use crate::ftp::types::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk configuration. Every field is optional; anything absent
/// falls through to the defaults in [`ClientConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub encoding: Option<String>,
    /// Remote base directory that relative remote paths resolve against.
    pub base_path: Option<String>,
    pub connect_timeout_sec: Option<u64>,
    pub data_timeout_sec: Option<u64>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ClientConfig,
    pub base_path: String,
}

/// Load the configuration file, if any.
///
/// An explicit path that cannot be read or parsed is an error; the
/// searched locations are allowed to be absent.
pub fn load_file(explicit: Option<&Path>) -> FtpResult<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_config(path).map(Some);
    }
    for candidate in search_paths() {
        if candidate.is_file() {
            return read_config(&candidate).map(Some);
        }
    }
    Ok(None)
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.json")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("ftpcmd").join("config.json"));
    }
    paths
}

fn read_config(path: &Path) -> FtpResult<FileConfig> {
    let body = std::fs::read_to_string(path).map_err(|e| {
        FtpError::invalid_config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&body).map_err(|e| {
        FtpError::invalid_config(format!("Cannot parse {}: {}", path.display(), e))
    })
}

/// Merge command line over file over defaults into runtime settings.
///
/// The encoding label is validated here so a typo fails before any
/// network traffic.
pub fn resolve(cli: &Cli, file: Option<FileConfig>) -> FtpResult<Settings> {
    let file = file.unwrap_or_default();
    let defaults = ClientConfig::default();

    let host = cli
        .host
        .clone()
        .or(file.host)
        .ok_or_else(|| FtpError::invalid_config("No host given (flag --host or config file)"))?;

    let encoding = cli
        .encoding
        .clone()
        .or(file.encoding)
        .unwrap_or(defaults.encoding);
    TextCodec::for_label(&encoding)?;

    let connection = ClientConfig {
        host,
        port: cli.port.or(file.port).unwrap_or(defaults.port),
        username: cli
            .user
            .clone()
            .or(file.username)
            .unwrap_or(defaults.username),
        password: cli
            .password
            .clone()
            .or(file.password)
            .unwrap_or(defaults.password),
        encoding,
        initial_directory: None,
        connect_timeout_sec: file
            .connect_timeout_sec
            .unwrap_or(defaults.connect_timeout_sec),
        data_timeout_sec: file.data_timeout_sec.unwrap_or(defaults.data_timeout_sec),
    };

    let base_path = file.base_path.unwrap_or_else(|| "/".to_string());

    Ok(Settings {
        connection,
        base_path,
    })
}

/// Resolve a remote argument against the base path: absolute paths pass
/// through, relative ones are joined.
pub fn resolve_remote(base_path: &str, remote: &str) -> String {
    if remote.starts_with('/') {
        remote.to_string()
    } else {
        crate::ftp::rpath::join(base_path, remote)
    }
}
