//! Ingest orchestrator: the public entry point wiring credentials, query
//! parsing, clone, walk, and render into a single call.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cache::DigestCache;
use crate::error::Error;
use crate::patterns;
use crate::types::{Credential, Digest, IngestOptions, IngestionQuery, OutputTarget};
use crate::{clone, credential, query, remote, render, timeout, walker};

/// Runs a full ingest: resolve credentials, parse `source`, clone (or reuse
/// a cache hit), walk, render, optionally write output, and always clean up
/// the scratch directory.
pub async fn ingest(source: &str, opts: &IngestOptions, cache: Option<&DigestCache>) -> Result<Digest, Error> {
    let cred = resolve_credential(opts)?;

    let mut query = query::parse(source, cred.as_ref()).await?;
    apply_overrides(&mut query, opts, cred.as_ref()).await?;

    if query.is_remote()
        && let Some(cache) = cache
        && let Some(digest) = cache.get(&query).await
    {
        info!(slug = %query.slug, "cache hit, skipping clone");
        return Ok(digest);
    }

    let outcome = run_pipeline(&query, opts, cred.as_ref()).await;

    cleanup_scratch(&query).await;

    let digest = outcome?;

    if query.is_remote()
        && let Some(cache) = cache
    {
        cache.put(&query, &digest).await?;
    }

    if let Some(target) = &opts.output {
        write_output(target, &digest).await?;
    }

    Ok(digest)
}

/// Blocking wrapper for callers without their own Tokio runtime.
pub fn ingest_blocking(source: &str, opts: &IngestOptions, cache: Option<&DigestCache>) -> Result<Digest, Error> {
    let rt = tokio::runtime::Runtime::new().map_err(Error::Io)?;
    rt.block_on(ingest(source, opts, cache))
}

fn resolve_credential(opts: &IngestOptions) -> Result<Option<Credential>, Error> {
    match credential::resolve_token(opts.token.as_deref()) {
        Some(token) => Ok(Some(credential::validate(&token)?)),
        None => Ok(None),
    }
}

/// Step 3-4: merges caller patterns into the query's sets and applies
/// branch/tag/submodule overrides, with tag winning over branch when both
/// are supplied. When an override actually changes the winning ref, the
/// query's `commit` (already set by the parser to the URL-derived ref) is
/// re-resolved against the new ref so the clone driver checks out what the
/// caller asked for rather than the parser's original guess.
async fn apply_overrides(query: &mut IngestionQuery, opts: &IngestOptions, cred: Option<&Credential>) -> Result<(), Error> {
    query.max_file_size = opts.max_file_size;
    query.max_files = opts.max_files;
    query.max_total_size = opts.max_total_size;

    let extra_exclude = patterns::parse_pattern_list(&opts.exclude_patterns)?;
    let include = patterns::parse_pattern_list(&opts.include_patterns)?;
    let (include, exclude) = patterns::merge_patterns(&query.exclude, &extra_exclude, &include);
    query.include = include;
    query.exclude = exclude;

    query.include_submodules = opts.include_submodules;

    let winning_ref = if let (Some(_), Some(tag)) = (&opts.branch, &opts.tag) {
        warn!(tag, "both branch and tag supplied, tag wins");
        query.tag = Some(tag.clone());
        query.branch = None;
        Some(format!("refs/tags/{tag}"))
    } else if opts.tag.is_some() {
        query.tag = opts.tag.clone();
        query.branch = None;
        Some(format!("refs/tags/{}", opts.tag.as_ref().unwrap()))
    } else if opts.branch.is_some() {
        query.branch = opts.branch.clone();
        query.tag = None;
        Some(format!("refs/heads/{}", opts.branch.as_ref().unwrap()))
    } else {
        None
    };

    if let (Some(git_ref), Some(url)) = (winning_ref, query.url.as_deref()) {
        query.commit = Some(remote::resolve_ref(url, &git_ref, cred).await?);
    }

    Ok(())
}

/// Steps 6-8: clone under the timeout harness, merge `.gitignore`-family
/// patterns, walk, and render. Isolated from cache/output/cleanup so the
/// caller can always run cleanup regardless of the outcome.
async fn run_pipeline(query: &IngestionQuery, opts: &IngestOptions, cred: Option<&Credential>) -> Result<Digest, Error> {
    if query.is_remote() {
        timeout::with_deadline(timeout::default_deadline(), clone::clone(query, cred)).await?;
    } else if tokio::fs::metadata(&query.local_path).await.is_err() {
        return Err(Error::NotADirectory(query.local_path.clone()));
    }

    let mut exclude = query.exclude.clone();
    if !opts.include_gitignored {
        exclude.extend(patterns::load_ignore_file(&query.local_path, ".gitignore").await?);
        exclude.extend(patterns::load_ignore_file(&query.local_path, ".gitingestignore").await?);
    }

    let compiled = patterns::compile_cached(&query.include, &exclude)?;
    let (tree, limit_hit) = walker::walk(query, &compiled).await?;
    if limit_hit {
        warn!(slug = %query.slug, "traversal limits were hit, digest is partial");
    }
    if walker::has_errors(&tree) {
        warn!(slug = %query.slug, "some files could not be read");
    }

    Ok(render::render(&tree, query))
}

async fn write_output(target: &OutputTarget, digest: &Digest) -> Result<(), Error> {
    match target {
        OutputTarget::Stdout => {
            println!("{}", digest.as_blob());
            Ok(())
        }
        OutputTarget::Path(path) => tokio::fs::write(path, digest.as_blob()).await.map_err(Error::Io),
    }
}

/// Unconditional cleanup with a single retry that clears read-only bits on
/// files that refuse deletion. Removes the scratch directory's parent (the
/// per-request id directory under the temp root), not just the repo slug
/// directory nested inside it, so nothing is left behind under the temp root.
async fn cleanup_scratch(query: &IngestionQuery) {
    if !query.is_remote() {
        return;
    }
    let dest = query
        .local_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| query.local_path.clone());
    let _ = tokio::task::spawn_blocking(move || remove_dir_with_retry(&dest)).await;
}

fn remove_dir_with_retry(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(_) => {
            clear_readonly(dir);
            std::fs::remove_dir_all(dir)
        }
    }
}

fn clear_readonly(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(meta) = entry.metadata() {
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                let _ = std::fs::set_permissions(&path, perms);
            }
            if meta.is_dir() {
                clear_readonly(&path);
            }
        }
    }
}

/// Convenience constructor used by the CLI and server front ends to build
/// [`IngestOptions`] from flat option values without depending on its field
/// layout directly.
pub fn options_from(
    max_file_size: u64,
    max_files: usize,
    max_total_size: u64,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    branch: Option<String>,
    tag: Option<String>,
    include_gitignored: bool,
    include_submodules: bool,
    token: Option<String>,
    output: Option<OutputTarget>,
) -> IngestOptions {
    IngestOptions {
        max_file_size,
        max_files,
        max_total_size,
        include_patterns,
        exclude_patterns,
        branch,
        tag,
        include_gitignored,
        include_submodules,
        token,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn local_query(path: PathBuf) -> IngestionQuery {
        IngestionQuery::for_local_path(path)
    }

    #[tokio::test]
    async fn apply_overrides_tag_wins_over_branch() {
        let mut q = local_query(PathBuf::from("/tmp"));
        let opts = IngestOptions {
            branch: Some("main".to_string()),
            tag: Some("v1.0".to_string()),
            ..IngestOptions::default()
        };
        apply_overrides(&mut q, &opts, None).await.unwrap();
        assert_eq!(q.tag.as_deref(), Some("v1.0"));
        assert!(q.branch.is_none());
    }

    #[tokio::test]
    async fn apply_overrides_merges_include_patterns_out_of_exclude() {
        let mut q = local_query(PathBuf::from("/tmp"));
        q.exclude = BTreeSet::from(["*.log".to_string()]);
        let opts = IngestOptions {
            include_patterns: vec!["*.log".to_string()],
            ..IngestOptions::default()
        };
        apply_overrides(&mut q, &opts, None).await.unwrap();
        assert!(q.include.contains("*.log"));
        assert!(!q.exclude.contains("*.log"));
    }

    /// A local query has no `url`, so even when an override names a winning
    /// ref, there is nothing to resolve it against — `commit` stays whatever
    /// the caller set it to.
    #[tokio::test]
    async fn apply_overrides_skips_commit_resolution_for_local_queries() {
        let mut q = local_query(PathBuf::from("/tmp"));
        let opts = IngestOptions {
            branch: Some("develop".to_string()),
            ..IngestOptions::default()
        };
        apply_overrides(&mut q, &opts, None).await.unwrap();
        assert_eq!(q.branch.as_deref(), Some("develop"));
        assert!(q.commit.is_none());
    }

    #[tokio::test]
    async fn cleanup_is_noop_for_local_queries() {
        let q = local_query(PathBuf::from("/nonexistent/should/not/be/touched"));
        cleanup_scratch(&q).await;
    }

    #[test]
    fn remove_dir_with_retry_tolerates_missing_dir() {
        let dir = std::env::temp_dir().join("repodigest-test-missing-dir-xyz");
        assert!(remove_dir_with_retry(&dir).is_ok());
    }

    #[test]
    fn remove_dir_with_retry_deletes_existing_tree() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("f.txt"), b"x").unwrap();
        let path = dir.path().to_path_buf();
        std::mem::forget(dir);
        assert!(remove_dir_with_retry(&path).is_ok());
        assert!(!path.exists());
    }
}
