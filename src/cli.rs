use std::path::PathBuf;

use clap::Parser;

/// `repodigest [source] [options]` — ingest a git repository (or local
/// directory) into a single text digest.
#[derive(Parser, Debug)]
#[command(
    name = "repodigest",
    about = "Ingest a git repository into a single text digest for LLM consumption",
    version
)]
pub struct Args {
    /// Local path, repository URL, or `owner/repo` slug
    #[arg(default_value = ".")]
    pub source: String,

    /// Per-file size cap in bytes
    #[arg(short = 's', long = "max-size")]
    pub max_size: Option<u64>,

    /// Glob pattern to exclude (repeatable)
    #[arg(short = 'e', long = "exclude-pattern", action = clap::ArgAction::Append)]
    pub exclude_pattern: Vec<String>,

    /// Glob pattern to include (repeatable)
    #[arg(short = 'i', long = "include-pattern", action = clap::ArgAction::Append)]
    pub include_pattern: Vec<String>,

    /// Branch to check out
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// Tag to check out (wins over `--branch` if both are given)
    #[arg(long)]
    pub tag: Option<String>,

    /// Don't aggregate `.gitignore`/`.gitingestignore` patterns into exclude
    #[arg(long)]
    pub include_gitignored: bool,

    /// Recursively check out submodules
    #[arg(long)]
    pub include_submodules: bool,

    /// Host credential (also read from `GITHUB_TOKEN`)
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Output path, `-` for stdout, omit to write `<owner>-<repo>.txt`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
