//! LIST / MLSD response parser.
//!
//! Supports three formats:
//! 1. **MLSD facts** (RFC 3659): `type=file;size=1234;modify=20260101120000; file.txt`
//! 2. **Unix-style** (`ls -l`): `-rw-r--r-- 1 owner group 1234 Jan  1 12:00 file.txt`
//! 3. **Windows/IIS-style**: `01-01-26  12:00AM       1234 file.txt`
//!
//! MLSD is tried first (machine-parsable, reports the entry type directly);
//! the free-text formats infer the kind from the permission string or the
//! `<DIR>` marker. Lines that match no format become `Unknown` entries so
//! callers can decide how to treat them — traversal never descends into an
//! `Unknown` entry.

use crate::ftp::types::{EntryKind, RemoteEntry};
use regex::Regex;

/// Parse a full multi-line LIST or MLSD response body.
pub fn parse_listing(raw: &str) -> Vec<RemoteEntry> {
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| parse_line(line.trim_end()))
        .filter(|e| e.name != "." && e.name != "..")
        .collect()
}

/// Parse a single line from a listing.
fn parse_line(line: &str) -> Option<RemoteEntry> {
    if line.contains(';') && line.contains('=') {
        if let Some(e) = parse_mlsd(line) {
            return Some(e);
        }
    }

    if let Some(e) = parse_unix(line) {
        return Some(e);
    }

    if let Some(e) = parse_windows(line) {
        return Some(e);
    }

    // Fallback: treat the whole line as an unclassifiable name.
    tracing::debug!("unclassifiable listing line: {}", line);
    Some(RemoteEntry {
        name: line.trim().to_string(),
        kind: EntryKind::Unknown,
        size: None,
        modified: None,
        raw: Some(line.to_string()),
    })
}

// ─── MLSD parser ─────────────────────────────────────────────────────

/// Parse an MLSD fact line: `fact1=val1;fact2=val2; filename`
fn parse_mlsd(line: &str) -> Option<RemoteEntry> {
    let (facts_str, name) = if let Some(pos) = line.find("; ") {
        (&line[..pos + 1], line[pos + 2..].to_string())
    } else if let Some(pos) = line.rfind(' ') {
        (&line[..pos], line[pos + 1..].to_string())
    } else {
        return None;
    };

    if name.is_empty() {
        return None;
    }

    let mut kind = EntryKind::Unknown;
    let mut size = None;
    let mut modified = None;
    for segment in facts_str.split(';') {
        let Some((k, v)) = segment.trim().split_once('=') else {
            continue;
        };
        match k.to_lowercase().as_str() {
            "type" => {
                kind = match v.to_lowercase().as_str() {
                    "dir" | "cdir" | "pdir" => EntryKind::Directory,
                    "file" => EntryKind::File,
                    _ => EntryKind::Unknown,
                }
            }
            "size" => size = v.parse::<u64>().ok(),
            "modify" => modified = Some(v.to_string()),
            _ => {}
        }
    }

    Some(RemoteEntry {
        name,
        kind,
        size,
        modified,
        raw: Some(line.to_string()),
    })
}

// ─── Unix-style parser ───────────────────────────────────────────────

/// Parse a Unix `ls -l` line:
/// ```text
/// drwxr-xr-x   2 user group  4096 Jan  1 12:00 dirname
/// -rw-r--r--   1 user group  1234 Jan  1  2025 file.txt
/// ```
///
/// The permission string's first character is the only kind signal a legacy
/// listing gives us: `d` is a directory, `-` a file, anything else
/// (symlinks, devices, ...) stays `Unknown`.
fn parse_unix(line: &str) -> Option<RemoteEntry> {
    let re = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})\s+   # permissions
        (\d+)\s+                         # link count
        (\S+)\s+                         # owner
        (\S+)\s+                         # group
        (\d+)\s+                         # size
        (\w{3}\s+\d{1,2}\s+[\d:]+)\s+   # date
        (.+)$                            # filename (possibly with -> target)
        ",
    )
    .ok()?;

    let caps = re.captures(line)?;

    let perms = caps.get(1)?.as_str();
    let size = caps.get(5)?.as_str().parse::<u64>().ok();
    let date_str = caps.get(6)?.as_str();
    let name_raw = caps.get(7)?.as_str();

    let kind = match perms.as_bytes().first() {
        Some(b'd') => EntryKind::Directory,
        Some(b'-') => EntryKind::File,
        _ => EntryKind::Unknown,
    };

    // Strip a symlink arrow so the name is at least usable for display.
    let name = match name_raw.find(" -> ") {
        Some(pos) => name_raw[..pos].to_string(),
        None => name_raw.to_string(),
    };

    Some(RemoteEntry {
        name,
        kind,
        size,
        modified: Some(date_str.trim().to_string()),
        raw: Some(line.to_string()),
    })
}

// ─── Windows-style parser ────────────────────────────────────────────

/// Parse a Windows / IIS style line:
/// ```text
/// 01-01-26  12:00AM       1234 file.txt
/// 01-01-26  12:00PM      <DIR> Directory Name
/// ```
fn parse_windows(line: &str) -> Option<RemoteEntry> {
    let re = Regex::new(
        r"(?x)
        ^(\d{2}-\d{2}-\d{2})\s+         # date
        (\d{1,2}:\d{2}(?:AM|PM)?)\s+    # time
        (<DIR>|\d+)\s+                   # size or <DIR>
        (.+)$                            # filename
        ",
    )
    .ok()?;

    let caps = re.captures(line)?;

    let date_str = caps.get(1)?.as_str();
    let time_str = caps.get(2)?.as_str();
    let size_or_dir = caps.get(3)?.as_str();
    let name = caps.get(4)?.as_str().to_string();

    let (kind, size) = if size_or_dir == "<DIR>" {
        (EntryKind::Directory, None)
    } else {
        (EntryKind::File, size_or_dir.parse::<u64>().ok())
    };

    Some(RemoteEntry {
        name,
        kind,
        size,
        modified: Some(format!("{} {}", date_str, time_str)),
        raw: Some(line.to_string()),
    })
}
