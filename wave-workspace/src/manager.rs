//! ABOUTME: Workspace Manager: per-step directory and git-worktree allocation

use crate::git_ops::{GitWorktreeOps, ProcessGitWorktreeOps};
use crate::sanitize::sanitize_branch_name;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use wave_core::{Result, WaveError};
use wave_pipeline::{Step, TemplateContext, WorkspaceType};

#[derive(Debug, Clone)]
struct WorktreeEntry {
    repo_root: PathBuf,
    path: PathBuf,
}

/// Resolves each step's workspace directory for one pipeline run.
///
/// `""` (fresh) steps each get their own directory under
/// `<workspace_root>/<run_id>/<step_id>`. `"ref"` steps reuse a dependency's
/// already-materialized directory. `"worktree"` steps share a directory
/// keyed by sanitized branch name, so two steps resolving to the same branch
/// reuse the same git worktree (invariant 4) and that worktree is
/// instantiated exactly once (invariant 3).
pub struct WorkspaceManager {
    workspace_root: PathBuf,
    run_id: String,
    git_ops: Arc<dyn GitWorktreeOps>,
    created: Mutex<HashMap<String, PathBuf>>,
    worktrees: Mutex<HashMap<String, WorktreeEntry>>,
}

impl WorkspaceManager {
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self::with_git_ops(workspace_root, run_id, Arc::new(ProcessGitWorktreeOps))
    }

    pub fn with_git_ops(
        workspace_root: impl Into<PathBuf>,
        run_id: impl Into<String>,
        git_ops: Arc<dyn GitWorktreeOps>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            run_id: run_id.into(),
            git_ops,
            created: Mutex::new(HashMap::new()),
            worktrees: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve (and, if necessary, materialize) the workspace directory for
    /// `step`. Must be called once per step, after all of its dependencies
    /// have already been resolved (the Pipeline Executor enforces this by
    /// walking the topological order).
    pub fn workspace_for(&self, step: &Step, template_ctx: &TemplateContext) -> Result<PathBuf> {
        let path = match step.workspace.workspace_type {
            WorkspaceType::Fresh => self.fresh_workspace(&step.id)?,
            WorkspaceType::Ref => self.ref_workspace(step)?,
            WorkspaceType::Worktree => self.worktree_workspace(step, template_ctx)?,
        };
        self.created.lock().insert(step.id.clone(), path.clone());
        Ok(path)
    }

    fn fresh_workspace(&self, step_id: &str) -> Result<PathBuf> {
        let path = self.workspace_root.join(&self.run_id).join(step_id);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    fn ref_workspace(&self, step: &Step) -> Result<PathBuf> {
        let Some(ref_id) = &step.workspace.r#ref else {
            return Err(WaveError::UnknownWorkspaceRef {
                step_id: step.id.clone(),
            });
        };
        self.created
            .lock()
            .get(ref_id)
            .cloned()
            .ok_or_else(|| WaveError::UnknownWorkspaceRef {
                step_id: ref_id.clone(),
            })
    }

    fn worktree_workspace(&self, step: &Step, template_ctx: &TemplateContext) -> Result<PathBuf> {
        let repo_root_raw = step.workspace.root.as_deref().unwrap_or(".");
        let repo_root = PathBuf::from(template_ctx.resolve_placeholders(repo_root_raw));

        let branch_raw = step
            .workspace
            .branch
            .as_deref()
            .unwrap_or("{{pipeline_context.branch_name}}");
        let branch = template_ctx.resolve_placeholders(branch_raw);
        let base = step
            .workspace
            .base
            .as_deref()
            .map(|b| template_ctx.resolve_placeholders(b))
            .unwrap_or_else(|| "main".to_string());

        let key = sanitize_branch_name(&branch);
        if key.is_empty() {
            return Err(WaveError::Configuration {
                message: format!(
                    "step '{}' resolved an empty worktree branch name from '{branch_raw}'",
                    step.id
                ),
            });
        }

        if let Some(entry) = self.worktrees.lock().get(&key) {
            info!(step_id = %step.id, branch = %key, "reusing existing worktree");
            return Ok(entry.path.clone());
        }

        let worktree_path = self.workspace_root.join(&self.run_id).join(format!("__wt_{key}"));
        self.git_ops
            .add_worktree(&repo_root, &worktree_path, &branch, &base)?;
        if let Err(e) = self.git_ops.mark_skip_worktree(&repo_root, "CLAUDE.md") {
            warn!(error = %e, "failed to mark CLAUDE.md skip-worktree, continuing");
        }

        self.worktrees.lock().insert(
            key,
            WorktreeEntry {
                repo_root,
                path: worktree_path.clone(),
            },
        );
        Ok(worktree_path)
    }

    /// Remove every worktree created by this run, each exactly once.
    /// Best-effort: a single removal failure is logged and does not stop the
    /// remaining cleanups.
    pub fn cleanup_worktrees(&self) {
        let entries: Vec<WorktreeEntry> = self.worktrees.lock().values().cloned().collect();
        for entry in entries {
            if let Err(e) = self.git_ops.remove_worktree(&entry.repo_root, &entry.path) {
                warn!(path = %entry.path.display(), error = %e, "failed to remove worktree during cleanup");
            }
        }
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}
