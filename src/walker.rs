//! Filesystem walker: depth-bounded, capped, filtered traversal that builds
//! a typed [`FsNode`] tree.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::classify;
use crate::defaults::DEFAULT_MAX_DEPTH;
use crate::error::Error;
use crate::patterns::CompiledPatterns;
use crate::types::{Content, FsNode, IngestionQuery, RepoKind};

/// Traversal caps, sourced from the query (itself seeded from [`crate::defaults`]
/// or overridden via [`crate::config::Config`]'s environment knobs) and
/// overridable per call.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_depth: usize,
    pub max_files: usize,
    pub max_total_size: u64,
    pub max_file_size: u64,
}

impl Limits {
    pub fn from_query(query: &IngestionQuery) -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: query.max_files,
            max_total_size: query.max_total_size,
            max_file_size: query.max_file_size,
        }
    }
}

/// Mutable counters checked against [`Limits`] before each file/directory enter.
#[derive(Debug, Default)]
struct Stats {
    total_files: usize,
    total_size: u64,
    limit_hit: bool,
}

/// Walks the tree rooted at `query.local_path / query.subpath`. Single
/// file when `kind == Blob` and the target is a regular file.
pub async fn walk(query: &IngestionQuery, patterns: &CompiledPatterns) -> Result<(FsNode, bool), Error> {
    let root = resolve_root(query);
    let limits = Limits::from_query(query);
    let mut stats = Stats::default();

    let meta = tokio::fs::metadata(&root)
        .await
        .map_err(|_| Error::NotADirectory(root.clone()))?;

    if query.kind == RepoKind::Blob && meta.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = classify::classify(&root).await;
        let node = FsNode::File {
            name,
            relative_path: PathBuf::from(root.file_name().unwrap_or_default()),
            size: meta.len(),
            depth: 0,
            content,
        };
        return Ok((node, false));
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string());

    let children = walk_dir(&root, &root, 0, &limits, &mut stats, patterns).await?;
    let (size, file_count, dir_count) = aggregate(&children);

    let root_node = FsNode::Directory {
        name,
        relative_path: PathBuf::new(),
        size,
        file_count,
        dir_count,
        depth: 0,
        children,
    };

    Ok((root_node, stats.limit_hit))
}

/// The local filesystem root a query's traversal starts from: `local_path`
/// for local queries, `local_path / subpath` for remote ones (the clone
/// driver already narrows `local_path` via sparse checkout).
fn resolve_root(query: &IngestionQuery) -> PathBuf {
    if query.subpath == "/" {
        query.local_path.clone()
    } else {
        query.local_path.join(query.subpath.trim_start_matches('/'))
    }
}

fn aggregate(children: &[FsNode]) -> (u64, usize, usize) {
    let size = children.iter().map(FsNode::size).sum();
    let file_count = children.iter().map(FsNode::file_count).sum();
    let dir_count = children
        .iter()
        .map(|c| match c {
            FsNode::Directory { dir_count, .. } => 1 + dir_count,
            _ => 0,
        })
        .sum();
    (size, file_count, dir_count)
}

fn walk_dir<'a>(
    root: &'a Path,
    dir: &'a Path,
    depth: usize,
    limits: &'a Limits,
    stats: &'a mut Stats,
    patterns: &'a CompiledPatterns,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<FsNode>, Error>> + Send + 'a>> {
    Box::pin(async move {
        if depth > limits.max_depth {
            warn!(depth, max = limits.max_depth, path = %dir.display(), "max depth exceeded, pruning");
            return Ok(Vec::new());
        }

        let mut children = Vec::new();
        let mut rd = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| Error::Io(e))?;

        while let Some(entry) = rd.next_entry().await.map_err(Error::Io)? {
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

            if patterns.is_excluded(&rel) {
                continue;
            }

            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not stat entry, skipping");
                    continue;
                }
            };

            if file_type.is_symlink() {
                if !patterns.file_included(&rel) {
                    continue;
                }
                let target = tokio::fs::read_link(&path).await.unwrap_or_default();
                stats.total_files += 1;
                let name = entry.file_name().to_string_lossy().into_owned();
                children.push(FsNode::Symlink {
                    name,
                    relative_path: rel,
                    target,
                    depth: depth + 1,
                });
                continue;
            }

            if file_type.is_file() {
                if !patterns.file_included(&rel) {
                    continue;
                }
                if stats.total_files + 1 > limits.max_files {
                    warn!(max = limits.max_files, "max file count exceeded, stopping enumeration");
                    stats.limit_hit = true;
                    break;
                }
                let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                if size > limits.max_file_size {
                    debug!(path = %path.display(), size, "file exceeds per-file size cap, skipping");
                    continue;
                }
                if stats.total_size + size > limits.max_total_size {
                    warn!(max = limits.max_total_size, "max total size exceeded, stopping enumeration");
                    stats.limit_hit = true;
                    break;
                }
                stats.total_files += 1;
                stats.total_size += size;
                let content = classify::classify(&path).await;
                let name = entry.file_name().to_string_lossy().into_owned();
                children.push(FsNode::File {
                    name,
                    relative_path: rel,
                    size,
                    depth: depth + 1,
                    content,
                });
                continue;
            }

            if file_type.is_dir() {
                if !patterns.dir_could_contain_match(&rel) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let sub_children = walk_dir(root, &path, depth + 1, limits, stats, patterns).await?;
                if sub_children.is_empty() {
                    continue;
                }
                let (size, file_count, dir_count) = aggregate(&sub_children);
                children.push(FsNode::Directory {
                    name,
                    relative_path: rel,
                    size,
                    file_count,
                    dir_count,
                    depth: depth + 1,
                    children: sub_children,
                });
                continue;
            }

            warn!(path = %path.display(), "unknown file type, skipping");
        }

        sort_children(&mut children);
        Ok(children)
    })
}

/// Deterministic ordering: README files first, then regular files, then
/// dot-files, then regular directories, then dot-directories; alphanumeric
/// case-insensitive within each group.
fn sort_children(children: &mut [FsNode]) {
    children.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(node: &FsNode) -> (u8, String) {
    let name_lower = node.name().to_lowercase();
    let group = match node {
        FsNode::File { .. } | FsNode::Symlink { .. } => {
            if name_lower == "readme" || name_lower.starts_with("readme.") {
                0
            } else if name_lower.starts_with('.') {
                2
            } else {
                1
            }
        }
        FsNode::Directory { .. } => {
            if name_lower.starts_with('.') {
                4
            } else {
                3
            }
        }
    };
    (group, name_lower)
}

/// `true` iff any file content in the tree could not be classified (used to
/// surface `LimitExceeded`/notebook warnings as part of the digest note).
pub fn has_errors(node: &FsNode) -> bool {
    match node {
        FsNode::File {
            content: Content::UnreadableError,
            ..
        } => true,
        FsNode::Directory { children, .. } => children.iter().any(has_errors),
        _ => false,
    }
}
