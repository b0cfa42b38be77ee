//! ABOUTME: Git worktree process shell-out

use std::path::Path;
use std::process::Command;
use tracing::debug;
use wave_core::{Result, WaveError};

/// Narrow interface over the git worktree commands the Workspace Manager
/// needs, so tests can substitute a fake instead of shelling out.
pub trait GitWorktreeOps: Send + Sync {
    fn add_worktree(&self, repo_root: &Path, worktree_path: &Path, branch: &str, base: &str) -> Result<()>;
    fn remove_worktree(&self, repo_root: &Path, worktree_path: &Path) -> Result<()>;
    fn mark_skip_worktree(&self, repo_root: &Path, relative_file: &str) -> Result<()>;
}

/// Default implementation, shelling out to the system `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGitWorktreeOps;

impl ProcessGitWorktreeOps {
    fn run(repo_root: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo_root)
            .args(args)
            .output()
            .map_err(|e| WaveError::Io {
                message: format!("failed to spawn git {}: {e}", args.join(" ")),
            })?;
        if !output.status.success() {
            return Err(WaveError::Internal {
                message: format!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(())
    }
}

impl GitWorktreeOps for ProcessGitWorktreeOps {
    fn add_worktree(&self, repo_root: &Path, worktree_path: &Path, branch: &str, base: &str) -> Result<()> {
        debug!(branch, base, path = %worktree_path.display(), "creating git worktree");
        let path_str = worktree_path.to_string_lossy().into_owned();
        // Try to reuse an existing local branch first; fall back to creating
        // a new branch off `base` if the branch doesn't exist yet.
        if Self::run(repo_root, &["worktree", "add", &path_str, branch]).is_ok() {
            return Ok(());
        }
        Self::run(repo_root, &["worktree", "add", "-b", branch, &path_str, base])
    }

    fn remove_worktree(&self, repo_root: &Path, worktree_path: &Path) -> Result<()> {
        let path_str = worktree_path.to_string_lossy().into_owned();
        debug!(path = %path_str, "removing git worktree");
        Self::run(repo_root, &["worktree", "remove", "--force", &path_str])
    }

    fn mark_skip_worktree(&self, repo_root: &Path, relative_file: &str) -> Result<()> {
        Self::run(repo_root, &["update-index", "--skip-worktree", relative_file])
    }
}
