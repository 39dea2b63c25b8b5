//! Read-only remote tree inspection: flat listing, indented tree, and
//! recursive find. No transfer side effects — these only ever list.
//!
//! Both recursive renderers carry their own depth ceiling as a defence
//! against pathological or adversarial directory graphs; hitting the
//! ceiling truncates that branch with a visible marker, never silently.

use crate::ftp::client::FtpClient;
use crate::ftp::error::FtpResult;
use crate::ftp::rpath;
use crate::ftp::types::{EntryKind, RemoteEntry};
use async_trait::async_trait;

/// Default ceiling for `tree`.
pub const TREE_MAX_DEPTH: u32 = 10;
/// Default ceiling for `find`.
pub const FIND_MAX_DEPTH: u32 = 20;

/// The one listing primitive the explorer needs. `FtpClient` implements
/// it; tests substitute an in-memory tree.
#[async_trait]
pub trait RemoteLister {
    async fn list_dir(&mut self, path: &str) -> FtpResult<Vec<RemoteEntry>>;
}

#[async_trait]
impl RemoteLister for FtpClient {
    async fn list_dir(&mut self, path: &str) -> FtpResult<Vec<RemoteEntry>> {
        FtpClient::list_dir(self, path).await
    }
}

// ─── ls ──────────────────────────────────────────────────────────────

/// Render one non-recursive listing as a table.
pub fn render_list(path: &str, entries: &[RemoteEntry]) -> String {
    let mut out = format!("Listing of {}:\n", path);
    out.push_str(&"-".repeat(64));
    out.push('\n');
    if entries.is_empty() {
        out.push_str("(empty directory)\n");
    }
    for entry in entries {
        let kind = match entry.kind {
            EntryKind::Directory => "DIR",
            EntryKind::File => "FILE",
            EntryKind::Unknown => "?",
        };
        let size = entry
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        let modified = entry.modified.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{:<4} {:>12}  {:<14} {}\n",
            kind, size, modified, entry.name
        ));
    }
    out.push_str(&"-".repeat(64));
    out.push('\n');
    out
}

// ─── tree ────────────────────────────────────────────────────────────

/// Render an indented tree of the remote directory.
///
/// The glyph on each line depends only on that entry's position among its
/// siblings and the chain of "is this ancestor the last sibling" flags —
/// no global state, so identical inputs always render identically.
pub async fn tree<L: RemoteLister + Send>(
    lister: &mut L,
    path: &str,
    max_depth: u32,
) -> FtpResult<String> {
    let root = path.trim_end_matches('/');
    let mut out = if root.is_empty() {
        "/\n".to_string()
    } else {
        format!("{}/\n", root)
    };
    let mut ancestors = Vec::new();
    tree_into(lister, path.to_string(), 0, max_depth, &mut ancestors, &mut out).await?;
    Ok(out)
}

async fn tree_into<L: RemoteLister + Send>(
    lister: &mut L,
    path: String,
    depth: u32,
    max_depth: u32,
    ancestors: &mut Vec<bool>,
    out: &mut String,
) -> FtpResult<()> {
    let entries = lister.list_dir(&path).await?;

    // Files first, then directories, each group sorted by name. Unknown
    // entries display as files and are never descended into.
    let mut files: Vec<&RemoteEntry> = Vec::new();
    let mut dirs: Vec<&RemoteEntry> = Vec::new();
    for entry in &entries {
        match entry.kind {
            EntryKind::Directory => dirs.push(entry),
            EntryKind::File => files.push(entry),
            EntryKind::Unknown => {
                tracing::warn!("ambiguous entry treated as file: {}", rpath::join(&path, &entry.name));
                files.push(entry);
            }
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    dirs.sort_by(|a, b| a.name.cmp(&b.name));

    let total = files.len() + dirs.len();
    let mut index = 0;

    for file in files {
        index += 1;
        out.push_str(&tree_line(ancestors, index == total, &file.name, false));
    }

    for dir in dirs {
        index += 1;
        let last = index == total;
        out.push_str(&tree_line(ancestors, last, &dir.name, true));

        ancestors.push(last);
        if depth + 1 > max_depth {
            tracing::warn!("tree depth limit {} reached at {}", max_depth, rpath::join(&path, &dir.name));
            let marker = format!("[max depth {} reached]", max_depth);
            out.push_str(&tree_line(ancestors, true, &marker, false));
        } else {
            let child = rpath::join(&path, &dir.name);
            Box::pin(tree_into(lister, child, depth + 1, max_depth, ancestors, out)).await?;
        }
        ancestors.pop();
    }
    Ok(())
}

fn tree_line(ancestors: &[bool], last: bool, name: &str, dir: bool) -> String {
    let mut line = String::new();
    for &ancestor_last in ancestors {
        line.push_str(if ancestor_last { "    " } else { "│   " });
    }
    line.push_str(if last { "└── " } else { "├── " });
    line.push_str(name);
    if dir {
        line.push('/');
    }
    line.push('\n');
    line
}

// ─── find ────────────────────────────────────────────────────────────

/// Recursive flat enumeration. Each line is prefixed with the depth
/// marker `-` repeated once per level; directories render as bare paths
/// with a trailing `/`, files are marked with `* `.
pub async fn find<L: RemoteLister + Send>(
    lister: &mut L,
    path: &str,
    max_depth: u32,
) -> FtpResult<String> {
    let root = path.trim_end_matches('/');
    let mut out = if root.is_empty() {
        "/\n".to_string()
    } else {
        format!("{}/\n", root)
    };
    find_into(lister, path.to_string(), 1, max_depth, &mut out).await?;
    Ok(out)
}

async fn find_into<L: RemoteLister + Send>(
    lister: &mut L,
    path: String,
    depth: u32,
    max_depth: u32,
    out: &mut String,
) -> FtpResult<()> {
    let mut entries = lister.list_dir(&path).await?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let marker = "-".repeat(depth as usize);
    for entry in entries {
        let full = rpath::join(&path, &entry.name);
        match entry.kind {
            EntryKind::Directory => {
                out.push_str(&format!("{} {}/\n", marker, full));
                if depth + 1 > max_depth {
                    tracing::warn!("find depth limit {} reached at {}", max_depth, full);
                    out.push_str(&format!(
                        "{} [max depth {} reached]\n",
                        "-".repeat(depth as usize + 1),
                        max_depth
                    ));
                } else {
                    Box::pin(find_into(lister, full, depth + 1, max_depth, out)).await?;
                }
            }
            EntryKind::File => {
                out.push_str(&format!("{} * {}\n", marker, full));
            }
            EntryKind::Unknown => {
                tracing::warn!("ambiguous entry treated as file: {}", full);
                out.push_str(&format!("{} * {}\n", marker, full));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftp::error::FtpError;
    use std::collections::HashMap;

    struct FakeLister {
        tree: HashMap<String, Vec<RemoteEntry>>,
    }

    #[async_trait]
    impl RemoteLister for FakeLister {
        async fn list_dir(&mut self, path: &str) -> FtpResult<Vec<RemoteEntry>> {
            self.tree
                .get(path.trim_end_matches('/'))
                .cloned()
                .ok_or_else(|| FtpError::not_found(format!("no such dir: {path}")))
        }
    }

    fn file(name: &str, size: u64) -> RemoteEntry {
        RemoteEntry {
            name: name.into(),
            kind: EntryKind::File,
            size: Some(size),
            modified: None,
            raw: None,
        }
    }

    fn dir(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.into(),
            kind: EntryKind::Directory,
            size: None,
            modified: None,
            raw: None,
        }
    }

    fn unknown(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.into(),
            kind: EntryKind::Unknown,
            size: None,
            modified: None,
            raw: None,
        }
    }

    /// 3-level fixture: two subdirectories, one holding a file, one empty.
    fn fixture() -> FakeLister {
        let mut tree = HashMap::new();
        tree.insert("/root".to_string(), vec![dir("sub2"), dir("sub1")]);
        tree.insert("/root/sub1".to_string(), vec![file("b.txt", 50)]);
        tree.insert("/root/sub2".to_string(), vec![]);
        FakeLister { tree }
    }

    #[tokio::test]
    async fn tree_glyphs_follow_sibling_position() {
        let mut lister = fixture();
        let out = tree(&mut lister, "/root", TREE_MAX_DEPTH).await.unwrap();
        assert_eq!(
            out,
            "/root/\n\
             ├── sub1/\n\
             │   └── b.txt\n\
             └── sub2/\n"
        );
    }

    #[tokio::test]
    async fn tree_is_deterministic() {
        let mut lister = fixture();
        let first = tree(&mut lister, "/root", TREE_MAX_DEPTH).await.unwrap();
        let second = tree(&mut lister, "/root", TREE_MAX_DEPTH).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn tree_truncates_at_ceiling() {
        let mut tree_map = HashMap::new();
        // A chain deeper than the ceiling: /d/c0/c1/...
        let mut path = "/d".to_string();
        tree_map.insert(path.clone(), vec![dir("c")]);
        for _ in 0..6 {
            let child = format!("{}/c", path);
            tree_map.insert(child.clone(), vec![dir("c")]);
            path = child;
        }
        let mut lister = FakeLister { tree: tree_map };
        let out = tree(&mut lister, "/d", 3).await.unwrap();
        assert_eq!(out.matches("[max depth 3 reached]").count(), 1);
        // Directories at depths 1 through 4 render; the marker replaces
        // the listing of the depth-4 directory.
        assert_eq!(out.matches("c/").count(), 4);
    }

    #[tokio::test]
    async fn tree_does_not_descend_into_unknown() {
        let mut tree_map = HashMap::new();
        tree_map.insert("/r".to_string(), vec![unknown("mystery")]);
        let mut lister = FakeLister { tree: tree_map };
        let out = tree(&mut lister, "/r", TREE_MAX_DEPTH).await.unwrap();
        assert_eq!(out, "/r/\n└── mystery\n");
    }

    #[tokio::test]
    async fn find_prefixes_marker_per_depth() {
        let mut lister = {
            let mut tree = HashMap::new();
            tree.insert("/root".to_string(), vec![file("a.txt", 10), dir("sub1")]);
            tree.insert("/root/sub1".to_string(), vec![file("b.txt", 50)]);
            FakeLister { tree }
        };
        let out = find(&mut lister, "/root", FIND_MAX_DEPTH).await.unwrap();
        assert_eq!(
            out,
            "/root/\n\
             - * /root/a.txt\n\
             - /root/sub1/\n\
             -- * /root/sub1/b.txt\n"
        );
    }

    #[tokio::test]
    async fn find_truncates_at_ceiling() {
        let mut tree_map = HashMap::new();
        let mut path = "/d".to_string();
        tree_map.insert(path.clone(), vec![dir("c")]);
        for _ in 0..5 {
            let child = format!("{}/c", path);
            tree_map.insert(child.clone(), vec![dir("c")]);
            path = child;
        }
        let mut lister = FakeLister { tree: tree_map };
        let out = find(&mut lister, "/d", 2).await.unwrap();
        assert!(out.contains("--- [max depth 2 reached]"), "{out}");
    }

    #[test]
    fn list_rendering() {
        let entries = vec![dir("photos"), file("a.txt", 1234)];
        let out = render_list("/root", &entries);
        assert!(out.contains("DIR"));
        assert!(out.contains("1234"));
        assert!(out.contains("a.txt"));

        let empty = render_list("/root", &[]);
        assert!(empty.contains("(empty directory)"));
    }
}
