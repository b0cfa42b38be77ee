//! ABOUTME: Path-traversal guard used whenever the orchestrator reads a user-declared path
//! ABOUTME: (schema_path, items_source, artifact defs) relative to a workspace root

use std::path::{Component, Path, PathBuf};
use wave_core::{Result, WaveError};

/// Resolves a (possibly relative) path against `root` and rejects any
/// result that would escape `root`.
pub trait PathSanitizer: Send + Sync {
    fn validate(&self, path: &Path, root: &Path) -> Result<PathBuf>;
}

/// Resolves `..`/`.` components manually (rather than trusting
/// `Path::canonicalize`, which requires the path to exist) and rejects any
/// path whose resolved form is not a descendant of `root`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootedPathSanitizer;

impl PathSanitizer for RootedPathSanitizer {
    fn validate(&self, path: &Path, root: &Path) -> Result<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };

        let mut resolved = Vec::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    if resolved.is_empty() {
                        return Err(WaveError::Security {
                            message: format!(
                                "path traversal rejected: {} escapes its root",
                                path.display()
                            ),
                        });
                    }
                    resolved.pop();
                }
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::Prefix(_) => resolved.clear(),
            }
        }

        let mut rebuilt = PathBuf::from("/");
        for part in &resolved {
            rebuilt.push(part);
        }

        let root_resolved = {
            let mut r = PathBuf::from("/");
            for component in root.components() {
                if let Component::Normal(part) = component {
                    r.push(part);
                }
            }
            r
        };

        if !rebuilt.starts_with(&root_resolved) {
            return Err(WaveError::Security {
                message: format!(
                    "path traversal rejected: {} resolves outside of {}",
                    path.display(),
                    root.display()
                ),
            });
        }

        Ok(rebuilt)
    }
}
