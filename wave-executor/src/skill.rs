//! ABOUTME: Skill provisioning external collaborator interface
//! ABOUTME: The actual skill-command generation/sandboxing lives outside this crate

use std::collections::HashSet;
use std::path::PathBuf;
use wave_core::Result;

/// Materializes slash-command files for a step's declared skills before the
/// adapter runs, returning the directory the adapter should be pointed at
/// (`AdapterRunConfig::skill_commands_dir`). Implemented outside this crate;
/// the Step Runner only ever calls `provision`.
pub trait SkillProvisioner: Send + Sync {
    fn provision(&self, skills: &HashSet<String>, workspace_dir: &std::path::Path) -> Result<Option<PathBuf>>;
}

/// A `SkillProvisioner` that never provisions anything, for pipelines and
/// tests that declare no skills.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSkillProvisioner;

impl SkillProvisioner for NoopSkillProvisioner {
    fn provision(&self, _skills: &HashSet<String>, _workspace_dir: &std::path::Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
