use std::path::PathBuf;

use clap::Parser;

use repodigest::ingest;
use repodigest::types::{IngestOptions, OutputTarget};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = repodigest::cli::Args::parse();
    let config = repodigest::config::Config::from_env();

    let output = match args.output.as_deref().and_then(|p| p.to_str()) {
        Some("-") => OutputTarget::Stdout,
        Some(_) => OutputTarget::Path(args.output.clone().unwrap()),
        None => OutputTarget::Path(default_output_path(&args.source)),
    };

    let opts = IngestOptions {
        max_file_size: args.max_size.unwrap_or(config.default_max_file_size),
        max_files: config.default_max_files,
        max_total_size: config.default_max_total_size,
        include_patterns: args.include_pattern,
        exclude_patterns: args.exclude_pattern,
        branch: args.branch,
        tag: args.tag,
        include_gitignored: args.include_gitignored,
        include_submodules: args.include_submodules,
        token: args.token,
        output: Some(output.clone()),
    };

    match ingest::ingest(&args.source, &opts, None).await {
        Ok(digest) => {
            let destination = match &output {
                OutputTarget::Stdout => "stdout".to_string(),
                OutputTarget::Path(path) => path.display().to_string(),
            };
            eprintln!("wrote digest to {destination} ({} bytes)", digest.as_blob().len());
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Best-effort `<owner>-<repo>.txt`/`<basename>.txt` default when the caller
/// didn't pass `-o`.
fn default_output_path(source: &str) -> PathBuf {
    let trimmed = source.trim_end_matches('/').trim_end_matches(".git");
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    let name = if segments.len() >= 2 {
        format!("{}-{}", segments[segments.len() - 2], segments[segments.len() - 1])
    } else {
        segments.last().copied().unwrap_or("repo").to_string()
    };
    PathBuf::from(format!("{name}.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path_uses_owner_repo() {
        assert_eq!(default_output_path("https://github.com/foo/bar"), PathBuf::from("foo-bar.txt"));
    }

    #[test]
    fn default_output_path_falls_back_to_basename() {
        assert_eq!(default_output_path("./local-dir"), PathBuf::from("local-dir.txt"));
    }
}
