//! Remote reference resolver: `ls-remote`-based existence probe, ref
//! enumeration, and ref→SHA resolution, without ever cloning.

use tokio::process::Command;

use crate::error::Error;
use crate::types::Credential;

/// `ls-remote --heads` or `ls-remote --tags --refs` target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Branches,
    Tags,
}

/// Runs `git ls-remote`, attaching `cred` as an extraheader when its family
/// matches `url`'s host. Returns raw stdout on success.
async fn run_ls_remote(url: &str, extra_args: &[&str], cred: Option<&Credential>) -> Result<String, Error> {
    let mut cmd = Command::new("git");

    if let Some(cred) = cred
        && let Some(host) = host_of(url)
        && crate::credential::applies_to_host(cred, &host)
    {
        cmd.args(["-c", &crate::credential::extraheader_config(&host, cred)]);
    }

    cmd.arg("ls-remote");
    cmd.args(extra_args);
    cmd.arg(url);

    let output = cmd
        .output()
        .await
        .map_err(|e| Error::RemoteError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if is_repo_not_found(stderr) {
            return Err(Error::RepoNotFound(url.to_string()));
        }
        return Err(Error::RemoteError(stderr.to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase))
}

/// Matches the stderr shapes hosts use for a genuinely missing repository,
/// as opposed to auth failures or transient network errors.
fn is_repo_not_found(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("repository not found") || lower.contains("not found") && lower.contains("repository")
}

/// `Exists(url, cred?) → bool`: true iff `HEAD` resolves.
/// Ambiguous failures (network down, auth required) surface as `false`.
pub async fn exists(url: &str, cred: Option<&Credential>) -> bool {
    resolve_ref(url, "HEAD", cred).await.is_ok()
}

/// `ListRefs(url, kind, cred?) → []string`: branch or tag names, stripped of
/// their `refs/heads/`/`refs/tags/` prefix. `--refs` suppresses peeled lines
/// for tags so callers never see a `^{}` suffix here.
pub async fn list_refs(url: &str, kind: RefKind, cred: Option<&Credential>) -> Result<Vec<String>, Error> {
    let (flag, prefix) = match kind {
        RefKind::Branches => ("--heads", "refs/heads/"),
        RefKind::Tags => ("--tags", "refs/tags/"),
    };
    let extra_args: Vec<&str> = match kind {
        RefKind::Branches => vec![flag],
        RefKind::Tags => vec![flag, "--refs"],
    };
    let stdout = run_ls_remote(url, &extra_args, cred).await?;

    Ok(stdout
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .filter_map(|r| r.strip_prefix(prefix))
        .map(str::to_string)
        .collect())
}

/// `ResolveRef(url, pattern, cred?) → SHA`: resolves `pattern` to a commit SHA.
///
/// Prefers a peeled annotated-tag line (`^{}` suffix, points at the commit)
/// over the tag object's own SHA; otherwise returns the first non-peeled SHA
/// seen. Fails with `RefNotFound` if no line matches.
pub async fn resolve_ref(url: &str, pattern: &str, cred: Option<&Credential>) -> Result<String, Error> {
    let stdout = run_ls_remote(url, &[pattern], cred).await?;

    let mut first_sha: Option<String> = None;
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((sha, ref_name)) = line.split_once('\t') else {
            continue;
        };
        if ref_name.ends_with("^{}") {
            return Ok(sha.to_string());
        }
        if first_sha.is_none() {
            first_sha = Some(sha.to_string());
        }
    }

    first_sha.ok_or_else(|| Error::RefNotFound(format!("{pattern} at {url}")))
}
