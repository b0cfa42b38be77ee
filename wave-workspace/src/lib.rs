//! ABOUTME: Workspace Manager: per-step directory allocation and git worktree lifecycle

pub mod git_ops;
pub mod manager;
pub mod sanitize;

pub use git_ops::{GitWorktreeOps, ProcessGitWorktreeOps};
pub use manager::WorkspaceManager;
pub use sanitize::sanitize_branch_name;
