use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("could not determine a git host for '{0}'")]
    NoHostFound(String),

    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("remote error: {0}")]
    RemoteError(String),

    #[error("clone failed: {0}")]
    CloneError(String),

    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("traversal limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("invalid notebook: {0}")]
    InvalidNotebook(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that are non-fatal to the overall `Ingest` call
    /// (traversal continues, a warning is logged, partial output is still returned).
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::LimitExceeded(_) | Error::InvalidNotebook(_))
    }
}
