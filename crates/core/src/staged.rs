//! Staged paths from git.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::coordinator::{CheckSummary, Coordinator, CoordinatorConfig, Separator};
use crate::error::{CheckError, Result};

/// Object id of the empty tree; the diff base before the first commit exists.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Added, copied, deleted (lowercase: excluded), modified, renamed, type-changed, unmerged,
/// unknown and broken-pair changes.
const DIFF_FILTER: &str = "--diff-filter=ACdMRTUXB";

fn git(repo: Option<&Path>) -> Command {
    let mut cmd = Command::new("git");
    if let Some(repo) = repo {
        cmd.arg("-C").arg(repo);
    }
    cmd
}

async fn git_output(repo: Option<&Path>, args: &[&str]) -> Result<Output> {
    git(repo)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(CheckError::Spawn)
}

fn git_failure(status: ExitStatus, stderr: &[u8]) -> CheckError {
    CheckError::Git {
        status,
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

fn not_captured(stream: &str) -> CheckError {
    CheckError::Spawn(io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("git {stream} was not captured"),
    ))
}

/// Top level of the working tree; staged paths are listed relative to it.
pub async fn toplevel(repo: Option<&Path>) -> Result<PathBuf> {
    let output = git_output(repo, &["rev-parse", "--show-toplevel"]).await?;
    if !output.status.success() {
        return Err(git_failure(output.status, &output.stderr));
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PathBuf::from(root))
}

/// `HEAD`, or the empty tree when the repository has no commits yet.
pub async fn diff_base(repo: Option<&Path>) -> Result<&'static str> {
    let output = git_output(repo, &["rev-parse", "--verify", "--quiet", "HEAD"]).await?;
    if output.status.success() {
        Ok("HEAD")
    } else {
        log::debug!("no HEAD commit, diffing the index against the empty tree");
        Ok(EMPTY_TREE)
    }
}

/// Validates every staged `.json` file of the repository at `repo` (or the current directory).
///
/// `config.base_dir` is replaced by the repository top level.
pub async fn check_staged(mut config: CoordinatorConfig, repo: Option<&Path>) -> Result<CheckSummary> {
    config.base_dir = Some(toplevel(repo).await?);
    let base = diff_base(repo).await?;

    let mut cmd = git(repo);
    cmd.args(["diff-index", "--cached", "--name-only", "-z", DIFF_FILTER, base]);
    check_listing(config, cmd).await
}

/// Runs `cmd` and validates the NUL-terminated paths it prints on stdout.
///
/// Stderr is drained on its own task while stdout is consumed. A non-zero exit is fatal and
/// carries the collected stderr.
async fn check_listing(config: CoordinatorConfig, mut cmd: Command) -> Result<CheckSummary> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(CheckError::Spawn)?;
    let stdout = child.stdout.take().ok_or_else(|| not_captured("stdout"))?;
    let mut stderr = child.stderr.take().ok_or_else(|| not_captured("stderr"))?;
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    let summary = Coordinator::new(config)
        .run_separated(BufReader::new(stdout), Separator::Nul)
        .await?;

    let status = child.wait().await.map_err(CheckError::PathStream)?;
    let stderr = stderr_task.await?.map_err(CheckError::PathStream)?;
    if !status.success() {
        return Err(git_failure(status, &stderr));
    }
    Ok(summary)
}
