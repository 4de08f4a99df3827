//! Clone driver: shallow/partial/sparse clone, fetch-by-SHA, checkout,
//! optional submodule update. On Windows, warns rather than fails when
//! `core.longpaths` isn't enabled globally.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::{Credential, IngestionQuery};

/// Clones `query` into `query.local_path`, checked out at `query.commit`.
pub async fn clone(query: &IngestionQuery, cred: Option<&Credential>) -> Result<(), Error> {
    let url = query.url.as_deref().expect("clone requires a remote query");
    let commit = query.commit.as_deref().expect("commit must be resolved before clone");
    let dest = query.local_path.as_path();
    let partial = query.subpath != "/";

    ensure_git_installed().await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::CloneError(format!("failed to create '{}': {e}", parent.display())))?;
    }

    info!(%url, local_path = %dest.display(), partial, "starting git clone");

    let mut clone_args: Vec<String> = vec![
        "clone".to_string(),
        "--single-branch".to_string(),
        "--no-checkout".to_string(),
        "--depth=1".to_string(),
    ];
    if partial {
        clone_args.push("--filter=blob:none".to_string());
        clone_args.push("--sparse".to_string());
    }
    clone_args.push(url.to_string());
    clone_args.push(dest.to_string_lossy().into_owned());

    run_git_toplevel(&clone_args, url, cred).await?;

    if partial {
        let sparse_path = sparse_checkout_path(query);
        debug!(path = %sparse_path, "setting sparse-checkout");
        run_git_in(dest, &["sparse-checkout", "set", &sparse_path], url, cred).await?;
    }

    debug!(commit, "fetching resolved commit");
    run_git_in(dest, &["fetch", "--depth=1", "origin", commit], url, cred).await?;

    info!(commit, "checking out commit");
    run_git_in(dest, &["checkout", commit], url, cred).await?;

    if query.include_submodules {
        info!("updating submodules");
        run_git_in(
            dest,
            &["submodule", "update", "--init", "--recursive", "--depth=1"],
            url,
            cred,
        )
        .await?;
    }

    Ok(())
}

/// Drops the filename component when `kind = blob`, leaving the containing
/// directory as the sparse-checkout target.
fn sparse_checkout_path(query: &IngestionQuery) -> String {
    let subpath = query.subpath.trim_start_matches('/');
    if query.kind == crate::types::RepoKind::Blob {
        match subpath.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => ".".to_string(),
        }
    } else {
        subpath.to_string()
    }
}

async fn ensure_git_installed() -> Result<(), Error> {
    Command::new("git")
        .arg("--version")
        .output()
        .await
        .map_err(|_| Error::CloneError("git is not installed or not accessible".to_string()))?;

    warn_if_longpaths_disabled().await;

    Ok(())
}

/// Windows only: deep repository trees routinely exceed the legacy 260-char
/// `MAX_PATH` limit, so warn (rather than fail) when `core.longpaths` isn't
/// enabled globally.
#[cfg(windows)]
async fn warn_if_longpaths_disabled() {
    let output = Command::new("git")
        .args(["config", "--global", "--get", "core.longpaths"])
        .output()
        .await;
    let enabled = matches!(
        output,
        Ok(o) if o.status.success() && String::from_utf8_lossy(&o.stdout).trim() == "true"
    );
    if !enabled {
        warn!(
            "git config core.longpaths is not enabled; clones with deeply nested paths may fail on Windows \
             (run `git config --global core.longpaths true`)"
        );
    }
}

#[cfg(not(windows))]
async fn warn_if_longpaths_disabled() {}

fn host_extraheader(url: &str, cred: Option<&Credential>) -> Option<String> {
    let cred = cred?;
    let host = url::Url::parse(url).ok()?.host_str()?.to_lowercase();
    crate::credential::applies_to_host(cred, &host).then(|| crate::credential::extraheader_config(&host, cred))
}

/// Runs `git <args>` with no implicit `-C`, used only for the initial clone
/// (which creates `dest`, so it cannot be the working directory yet).
async fn run_git_toplevel(args: &[String], url: &str, cred: Option<&Credential>) -> Result<(), Error> {
    let mut cmd = Command::new("git");
    if let Some(header) = host_extraheader(url, cred) {
        cmd.args(["-c", &header]);
    }
    cmd.args(args);
    run(cmd).await
}

async fn run_git_in(dir: &Path, args: &[&str], url: &str, cred: Option<&Credential>) -> Result<(), Error> {
    let mut cmd = Command::new("git");
    cmd.args(["-C", &dir.to_string_lossy()]);
    if let Some(header) = host_extraheader(url, cred) {
        cmd.args(["-c", &header]);
    }
    cmd.args(args);
    run(cmd).await
}

async fn run(mut cmd: Command) -> Result<(), Error> {
    cmd.kill_on_drop(true);
    let output = cmd
        .output()
        .await
        .map_err(|e| Error::CloneError(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CloneError(stderr.trim().to_string()));
    }
    Ok(())
}
