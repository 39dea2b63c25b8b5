use clap::Parser;
use ftpcmd::cli::{Cli, Command};
use ftpcmd::config;
use ftpcmd::ftp::error::FtpResult;
use ftpcmd::ftp::explorer;
use ftpcmd::ftp::mirror;
use ftpcmd::ftp::progress::ProgressReporter;
use ftpcmd::ftp::rpath;
use ftpcmd::ftp::types::{EntryKind, TransferOutcome};
use ftpcmd::ftp::FtpClient;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays pipeable. `RUST_LOG` overrides the
/// `--log-level` flag.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: &Cli) -> FtpResult<ExitCode> {
    let file = config::load_file(cli.config.as_deref())?;
    let settings = config::resolve(cli, file)?;

    let mut client = FtpClient::connect(settings.connection.clone()).await?;
    let result = dispatch(cli, &mut client, &settings.base_path).await;
    let _ = client.quit().await;
    result
}

async fn dispatch(cli: &Cli, client: &mut FtpClient, base_path: &str) -> FtpResult<ExitCode> {
    let mut reporter = ProgressReporter::new();

    match &cli.command {
        // ── put ──────────────────────────────────────────────────
        Command::Put { local, remote } => {
            let remote = remote
                .clone()
                .unwrap_or_else(|| local_base_name(local));
            let remote = config::resolve_remote(base_path, &remote);

            if local.is_dir() {
                let summary =
                    mirror::upload_tree(client, local, &remote, &mut reporter).await?;
                println!("{} -> {}: {}", local.display(), remote, summary);
                Ok(exit_for_summary(cli.strict, summary.is_clean()))
            } else {
                match client.upload_file(local, &remote, &mut reporter).await? {
                    TransferOutcome::Transferred { bytes } => {
                        println!("{} -> {}: {} bytes", local.display(), remote, bytes)
                    }
                    TransferOutcome::Skipped => {
                        println!("{} -> {}: already complete", local.display(), remote)
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
        }

        // ── get ──────────────────────────────────────────────────
        Command::Get { remote, local } => {
            let remote = config::resolve_remote(base_path, remote);
            let local = local
                .clone()
                .unwrap_or_else(|| PathBuf::from(remote_base_name(&remote)));

            match client.classify(&remote).await? {
                EntryKind::Directory => {
                    let summary =
                        mirror::download_tree(client, &remote, &local, &mut reporter).await?;
                    println!("{} -> {}: {}", remote, local.display(), summary);
                    Ok(exit_for_summary(cli.strict, summary.is_clean()))
                }
                _ => {
                    match client.download_file(&remote, &local, &mut reporter).await? {
                        TransferOutcome::Transferred { bytes } => {
                            println!("{} -> {}: {} bytes", remote, local.display(), bytes)
                        }
                        TransferOutcome::Skipped => {
                            println!("{} -> {}: already complete", remote, local.display())
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
            }
        }

        // ── ls ───────────────────────────────────────────────────
        Command::Ls { remote } => {
            let path = remote_or_base(remote.as_deref(), base_path);
            let entries = client.list_dir(&path).await?;
            print!("{}", explorer::render_list(&path, &entries));
            Ok(ExitCode::SUCCESS)
        }

        // ── tree ─────────────────────────────────────────────────
        Command::Tree { remote, max_depth } => {
            let path = remote_or_base(remote.as_deref(), base_path);
            let rendered = explorer::tree(client, &path, *max_depth).await?;
            print!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }

        // ── find ─────────────────────────────────────────────────
        Command::Find { remote, max_depth } => {
            let path = remote_or_base(remote.as_deref(), base_path);
            let rendered = explorer::find(client, &path, *max_depth).await?;
            print!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Mirror runs report per-branch failures in the summary instead of
/// aborting; only `--strict` turns an unclean summary into a failure exit.
fn exit_for_summary(strict: bool, clean: bool) -> ExitCode {
    if strict && !clean {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn remote_or_base(remote: Option<&str>, base_path: &str) -> String {
    match remote {
        Some(r) => config::resolve_remote(base_path, r),
        None => base_path.to_string(),
    }
}

fn local_base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn remote_base_name(remote: &str) -> String {
    rpath::file_name(remote)
        .filter(|n| !n.is_empty())
        .unwrap_or("downloaded")
        .to_string()
}
