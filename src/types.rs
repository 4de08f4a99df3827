use std::collections::BTreeSet;
use std::path::PathBuf;

use uuid::Uuid;

/// One of the URL shapes recognized by the query parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Tree,
    Blob,
    Issues,
    Pull,
    None,
}

/// The canonical parsed request, populated incrementally by the query parser
/// and clone driver. `commit` is always set by the time the clone driver runs.
#[derive(Debug, Clone)]
pub struct IngestionQuery {
    pub id: Uuid,
    pub host: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub url: Option<String>,
    pub kind: RepoKind,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    pub subpath: String,
    pub local_path: PathBuf,
    pub slug: String,
    pub max_file_size: u64,
    pub max_files: usize,
    pub max_total_size: u64,
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
    pub include_submodules: bool,
}

impl IngestionQuery {
    /// A query for a local directory: no remote fields are set.
    pub fn for_local_path(path: PathBuf) -> Self {
        let slug = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        Self {
            id: Uuid::new_v4(),
            host: None,
            owner: None,
            repo: None,
            url: None,
            kind: RepoKind::None,
            branch: None,
            tag: None,
            commit: None,
            subpath: "/".to_string(),
            local_path: path,
            slug,
            max_file_size: crate::defaults::DEFAULT_MAX_FILE_SIZE,
            max_files: crate::defaults::DEFAULT_MAX_FILES,
            max_total_size: crate::defaults::DEFAULT_MAX_TOTAL_SIZE,
            include: BTreeSet::new(),
            exclude: crate::defaults::default_ignore_set(),
            include_submodules: false,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.url.is_some()
    }
}

/// A node in the filtered filesystem tree.
///
/// A tagged sum rather than a duck-typed variant: each constructor carries
/// exactly the fields meaningful for that kind.
#[derive(Debug, Clone)]
pub enum FsNode {
    Directory {
        name: String,
        relative_path: PathBuf,
        size: u64,
        file_count: usize,
        dir_count: usize,
        depth: usize,
        children: Vec<FsNode>,
    },
    File {
        name: String,
        relative_path: PathBuf,
        size: u64,
        depth: usize,
        content: Content,
    },
    Symlink {
        name: String,
        relative_path: PathBuf,
        target: PathBuf,
        depth: usize,
    },
}

impl FsNode {
    pub fn name(&self) -> &str {
        match self {
            FsNode::Directory { name, .. } => name,
            FsNode::File { name, .. } => name,
            FsNode::Symlink { name, .. } => name,
        }
    }

    pub fn relative_path(&self) -> &PathBuf {
        match self {
            FsNode::Directory { relative_path, .. } => relative_path,
            FsNode::File { relative_path, .. } => relative_path,
            FsNode::Symlink { relative_path, .. } => relative_path,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            FsNode::Directory { size, .. } => *size,
            FsNode::File { size, .. } => *size,
            FsNode::Symlink { .. } => 0,
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            FsNode::Directory { file_count, .. } => *file_count,
            FsNode::File { .. } | FsNode::Symlink { .. } => 1,
        }
    }
}

/// The outcome of classifying a single file's bytes.
#[derive(Debug, Clone)]
pub enum Content {
    Text { body: String },
    Binary,
    Empty,
    Notebook { script: String },
    UnreadableError,
}

/// Options accepted by the public `Ingest` entry point.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_file_size: u64,
    pub max_files: usize,
    pub max_total_size: u64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub include_gitignored: bool,
    pub include_submodules: bool,
    pub token: Option<String>,
    pub output: Option<OutputTarget>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_file_size: crate::defaults::DEFAULT_MAX_FILE_SIZE,
            max_files: crate::defaults::DEFAULT_MAX_FILES,
            max_total_size: crate::defaults::DEFAULT_MAX_TOTAL_SIZE,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            branch: None,
            tag: None,
            include_gitignored: false,
            include_submodules: false,
            token: None,
            output: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OutputTarget {
    Path(PathBuf),
    Stdout,
}

/// The three rendered outputs of a successful ingest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Digest {
    pub summary: String,
    pub tree: String,
    pub content: String,
}

impl Digest {
    /// The blob persisted to disk/object storage: tree, then content, newline-joined.
    pub fn as_blob(&self) -> String {
        format!("{}\n{}", self.tree, self.content)
    }
}

/// Host credential, tagged by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFamily {
    GitHub,
}

#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub family: CredentialFamily,
}
