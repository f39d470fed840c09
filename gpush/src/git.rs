use std::path::{Path, PathBuf};

use duct::cmd as duct_cmd;
use git2::{BranchType, Oid, Repository};
use tracing::{debug, warn};

use crate::error::GpushError;
use crate::run::RunError;

pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    Repository::discover(start)
        .ok()
        .and_then(|repo| repo.workdir().map(|p| p.to_path_buf()))
}

pub fn is_git_repository(start: &Path) -> bool {
    Repository::discover(start).is_ok()
}

/// Read-only view of the local branch and its upstream.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn discover(start: &Path) -> Result<Self, GpushError> {
        Ok(Self {
            repo: Repository::discover(start)?,
        })
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    pub fn is_detached_head(&self) -> Result<bool, GpushError> {
        Ok(self.repo.head_detached()?)
    }

    fn upstream_branch(&self) -> Option<git2::Branch<'_>> {
        let head = self.repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        let local = self
            .repo
            .find_branch(head.shorthand()?, BranchType::Local)
            .ok()?;
        local.upstream().ok()
    }

    /// e.g. `origin/main`; `None` when the current branch tracks nothing.
    pub fn upstream_branch_name(&self) -> Option<String> {
        self.upstream_branch()?
            .name()
            .ok()
            .flatten()
            .map(str::to_string)
    }

    fn head_and_upstream(&self) -> Option<(Oid, Oid)> {
        let local = self.repo.head().ok()?.target()?;
        let upstream = self.upstream_branch()?.get().target()?;
        Some((local, upstream))
    }

    /// Commits (ahead, behind) relative to the upstream branch.
    pub fn ahead_behind(&self) -> Result<Option<(usize, usize)>, GpushError> {
        let Some((local, upstream)) = self.head_and_upstream() else {
            return Ok(None);
        };
        Ok(Some(self.repo.graph_ahead_behind(local, upstream)?))
    }

    pub fn up_to_date_or_ahead(&self) -> bool {
        matches!(self.ahead_behind(), Ok(Some((_, 0))))
    }

    pub fn behind_upstream(&self) -> bool {
        !self.up_to_date_or_ahead()
    }

    pub fn at_same_commit_as_upstream(&self) -> bool {
        self.head_and_upstream()
            .is_some_and(|(local, upstream)| local == upstream)
    }
}

/// Refreshes remote-tracking refs. Failures (offline, no remote) only get logged.
pub fn fetch(repo_root: &Path) {
    let result = duct_cmd("git", ["fetch"])
        .dir(repo_root)
        .stdout_null()
        .stderr_capture()
        .unchecked()
        .run();
    match result {
        Ok(out) if out.status.success() => debug!("git fetch done"),
        Ok(out) => warn!(
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "git fetch failed"
        ),
        Err(err) => warn!(error = %err, "could not run git fetch"),
    }
}

/// Runs `git push`, or `git push -u origin HEAD` when the branch has no upstream yet.
/// Output goes straight to the terminal. Returns whether the push succeeded.
pub fn push(repo_root: &Path, set_upstream: bool) -> Result<bool, GpushError> {
    let args: &[&str] = if set_upstream {
        &["push", "-u", "origin", "HEAD"]
    } else {
        &["push"]
    };
    let out = duct_cmd("git", args.to_vec())
        .dir(repo_root)
        .unchecked()
        .run()
        .map_err(RunError::Io)?;
    Ok(out.status.success())
}

/// The lines of `git status` that explain where the branch stands.
pub fn status_summary(repo_root: &Path) -> String {
    let status = duct_cmd("git", ["status"])
        .dir(repo_root)
        .stderr_null()
        .unchecked()
        .read()
        .unwrap_or_default();
    pick_status_lines(&status)
}

pub fn pick_status_lines(status: &str) -> String {
    ["branch", "HEAD"]
        .into_iter()
        .map(|needle| {
            status
                .lines()
                .filter(|line| line.contains(needle))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .find(|picked| !picked.is_empty())
        .unwrap_or_else(|| status.trim_end().to_string())
}
