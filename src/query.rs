//! URL/slug parser: turns heterogeneous user input into a canonical
//! [`IngestionQuery`], resolving `ref` to an immutable commit SHA against
//! the remote.

use std::path::PathBuf;

use tracing::warn;

use crate::defaults::KNOWN_GIT_HOSTS;
use crate::error::Error;
use crate::remote;
use crate::types::{Credential, IngestionQuery, RepoKind};

/// Parses `source` into a fully populated [`IngestionQuery`], with `commit`
/// always set on success. Dispatches to the remote parser when `source`
/// looks like a URL/host/slug, else treats it as a local filesystem path.
pub async fn parse(source: &str, cred: Option<&Credential>) -> Result<IngestionQuery, Error> {
    let source = source.trim().trim_end_matches(".git");
    // An existing path on disk always wins, resolving the ambiguity between a
    // bare slug ("owner/repo") and a two-segment relative path ("src/lib.rs").
    if tokio::fs::metadata(source).await.is_ok() {
        return Ok(IngestionQuery::for_local_path(PathBuf::from(source)));
    }
    if looks_remote(source) {
        parse_remote(source, cred).await
    } else {
        Ok(IngestionQuery::for_local_path(PathBuf::from(source)))
    }
}

/// Heuristic used by the orchestrator to route `source`: has a scheme, names
/// a known host as its first segment, or is a bare two-segment slug.
fn looks_remote(source: &str) -> bool {
    if source.starts_with("http://") || source.starts_with("https://") {
        return true;
    }
    let first_segment = source.split('/').next().unwrap_or("");
    if first_segment.contains('.') {
        return true;
    }
    // Bare slug: exactly "owner/repo" with no further path, no scheme, no dot-host.
    let parts: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
    parts.len() >= 2 && !source.starts_with('/') && !source.starts_with('.')
}

async fn parse_remote(source: &str, cred: Option<&Credential>) -> Result<IngestionQuery, Error> {
    let decoded = percent_decode(source);

    let (host, path) = split_scheme_host_path(&decoded, cred).await?;

    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if segments.len() < 2 {
        return Err(Error::InvalidInput(format!("invalid repository path '{path}'")));
    }
    let owner = segments.remove(0);
    let repo = segments.remove(0);
    let url = format!("https://{host}/{owner}/{repo}");

    let slug = format!("{owner}-{repo}");
    let mut query = IngestionQuery {
        host: Some(host.clone()),
        owner: Some(owner.clone()),
        repo: Some(repo.clone()),
        url: Some(url.clone()),
        slug: slug.clone(),
        ..IngestionQuery::for_local_path(PathBuf::new())
    };
    query.local_path = std::env::temp_dir().join(query.id.to_string()).join(&slug);

    if segments.is_empty() {
        // Bare "owner/repo": functionally a full-tree ingest of the default
        // branch's root, so the renderer's "Files analyzed" line applies.
        query.kind = RepoKind::Tree;
        query.commit = Some(remote::resolve_ref(&url, "HEAD", cred).await?);
        return Ok(query);
    }

    let kind_token = segments.remove(0);
    query.kind = match kind_token.as_str() {
        "issues" => RepoKind::Issues,
        "pull" => RepoKind::Pull,
        "tree" => RepoKind::Tree,
        "blob" => RepoKind::Blob,
        other => {
            warn!(kind = other, %url, "unsupported path kind, falling back to repository root");
            query.kind = RepoKind::Tree;
            query.commit = Some(remote::resolve_ref(&url, "HEAD", cred).await?);
            return Ok(query);
        }
    };

    if matches!(query.kind, RepoKind::Issues | RepoKind::Pull) {
        warn!(%url, "issues/pull requests are not supported, falling back to repository root");
        query.kind = RepoKind::Tree;
        query.commit = Some(remote::resolve_ref(&url, "HEAD", cred).await?);
        return Ok(query);
    }

    if segments.is_empty() {
        warn!(%url, "no ref/path segments after tree or blob, falling back to repository root");
        query.kind = RepoKind::Tree;
        query.commit = Some(remote::resolve_ref(&url, "HEAD", cred).await?);
        return Ok(query);
    }

    resolve_ref_and_subpath(&mut query, &url, segments, cred).await?;

    if query.commit.is_none() {
        query.commit = Some(remote::resolve_ref(&url, "HEAD", cred).await?);
    }

    Ok(query)
}

/// Determines ref/subpath from the remaining path segments, then resolves
/// whichever ref was found to its commit SHA so the clone driver checks out
/// the ref the caller actually asked for, not just the default branch's
/// HEAD. A 40-hex first segment is always treated as a commit, even if it
/// happens to also name a branch — commit wins on ambiguity.
async fn resolve_ref_and_subpath(
    query: &mut IngestionQuery,
    url: &str,
    mut segments: Vec<String>,
    cred: Option<&Credential>,
) -> Result<(), Error> {
    if is_valid_commit_hash(&segments[0]) {
        query.commit = Some(segments.remove(0));
        query.subpath = join_subpath(&segments);
        return Ok(());
    }

    if let Some(tag) = longest_ref_prefix_match(url, &segments, remote::RefKind::Tags, cred).await {
        let consumed = tag.split('/').count();
        segments.drain(..consumed);
        query.subpath = join_subpath(&segments);
        query.commit = Some(remote::resolve_ref(url, &format!("refs/tags/{tag}"), cred).await?);
        query.tag = Some(tag);
        return Ok(());
    }

    if let Some(branch) = longest_ref_prefix_match(url, &segments, remote::RefKind::Branches, cred).await {
        let consumed = branch.split('/').count();
        segments.drain(..consumed);
        query.subpath = join_subpath(&segments);
        query.commit = Some(remote::resolve_ref(url, &format!("refs/heads/{branch}"), cred).await?);
        query.branch = Some(branch);
        return Ok(());
    }

    // Neither matched: either the remote truly has no such ref, or the lookup
    // itself failed (network). Best-effort: treat the first segment as the
    // ref and the remainder as subpath, and try to resolve that ref directly;
    // if that also fails, leave `commit` unset so the caller falls back to HEAD.
    warn!(%url, "could not resolve ref against remote tags/branches, using best-effort split");
    let ref_guess = segments.remove(0);
    query.subpath = join_subpath(&segments);
    match remote::resolve_ref(url, &ref_guess, cred).await {
        Ok(sha) => query.commit = Some(sha),
        Err(_) => warn!(%url, ref_guess, "best-effort ref also failed to resolve, falling back to HEAD"),
    }
    query.branch = Some(ref_guess);
    Ok(())
}

/// Finds the longest `/`-joined prefix of `segments` that names an existing
/// tag/branch, letting ref names containing `/` (e.g. `feature/fix1`)
/// round-trip through the path segments.
async fn longest_ref_prefix_match(
    url: &str,
    segments: &[String],
    kind: remote::RefKind,
    cred: Option<&Credential>,
) -> Option<String> {
    let refs = remote::list_refs(url, kind, cred).await.ok()?;
    let mut candidate = String::new();
    let mut best: Option<String> = None;
    for seg in segments {
        if candidate.is_empty() {
            candidate.push_str(seg);
        } else {
            candidate.push('/');
            candidate.push_str(seg);
        }
        if refs.iter().any(|r| r == &candidate) {
            best = Some(candidate.clone());
        }
    }
    best
}

fn join_subpath(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Extracts `(host, path)` from a fully-qualified URL, a scheme-less
/// `host/owner/repo`, or a bare slug (probing `remote::exists` in host order).
async fn split_scheme_host_path(source: &str, cred: Option<&Credential>) -> Result<(String, String), Error> {
    if let Some(rest) = source.strip_prefix("https://").or_else(|| source.strip_prefix("http://")) {
        let scheme = if source.starts_with("https://") { "https" } else { "http" };
        validate_scheme(scheme)?;
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = host.to_lowercase();
        validate_host(&host)?;
        return Ok((host, path.to_string()));
    }

    let first_segment = source.split('/').next().unwrap_or("");
    if first_segment.contains('.') {
        let host = first_segment.to_lowercase();
        validate_host(&host)?;
        let path = source.split_once('/').map(|(_, p)| p).unwrap_or("");
        return Ok((host, path.to_string()));
    }

    // Bare slug: probe the known-host list in order, using the first host
    // for which a HEAD exists. Credentials only carry to their matching family.
    for host in KNOWN_GIT_HOSTS {
        let probe_url = format!("https://{host}/{source}");
        if remote::exists(&probe_url, cred).await {
            return Ok((host.to_string(), source.to_string()));
        }
    }
    Err(Error::NoHostFound(source.to_string()))
}

fn validate_scheme(scheme: &str) -> Result<(), Error> {
    if scheme == "http" || scheme == "https" {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid URL scheme '{scheme}'")))
    }
}

/// Accepts any known host, or one matching the self-hosted heuristic
/// `startswith("git.", "gitlab.", "github.")`.
fn validate_host(host: &str) -> Result<(), Error> {
    let lower = host.to_lowercase();
    if KNOWN_GIT_HOSTS.contains(&lower.as_str())
        || lower.starts_with("git.")
        || lower.starts_with("gitlab.")
        || lower.starts_with("github.")
    {
        Ok(())
    } else {
        Err(Error::UnknownDomain(host.to_string()))
    }
}

fn is_valid_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s).decode_utf8_lossy().into_owned()
}
