//! ABOUTME: Identifier helpers used across the workspace
//! ABOUTME: Run ids are `<pipeline_name>-<hash>`; hash length is configurable

use uuid::Uuid;

/// Derive the short hex hash suffix used in a run id, truncated to `len` hex
/// digits (minimum 4, per the manifest's `pipeline_id_hash_length`).
#[must_use]
pub fn short_hash(len: usize) -> String {
    let uuid = Uuid::new_v4();
    let hex = uuid.simple().to_string();
    let len = len.clamp(4, hex.len());
    hex[..len].to_string()
}

/// Build a run id of the form `<pipeline_name>-<hash>`.
#[must_use]
pub fn make_run_id(pipeline_name: &str, hash_length: usize) -> String {
    format!("{pipeline_name}-{}", short_hash(hash_length))
}

/// Deterministic id derived from a name, mirroring the teacher's
/// `ComponentId::from_name` (UUID v5 over the DNS namespace). Used to give
/// matrix workers and worktree workspaces stable, reproducible identifiers.
#[must_use]
pub fn deterministic_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_respects_length() {
        assert_eq!(short_hash(8).len(), 8);
        assert_eq!(short_hash(2).len(), 4); // clamped to minimum
        assert_eq!(short_hash(64).len(), 32); // clamped to hex length
    }

    #[test]
    fn run_id_has_expected_shape() {
        let id = make_run_id("speckit", 8);
        assert!(id.starts_with("speckit-"));
        assert_eq!(id.len(), "speckit-".len() + 8);
    }

    #[test]
    fn deterministic_id_is_stable() {
        assert_eq!(deterministic_id("a"), deterministic_id("a"));
        assert_ne!(deterministic_id("a"), deterministic_id("b"));
    }
}
