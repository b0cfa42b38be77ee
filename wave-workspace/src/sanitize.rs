//! ABOUTME: Git branch-name sanitization for worktree directory naming

/// Turn an arbitrary template-resolved branch name into something safe to use
/// as both a git branch name and a directory component: characters outside
/// `[A-Za-z0-9_-]` become `-`, runs of `-` collapse to one, leading/trailing
/// `-` are trimmed, and the result is truncated to 50 characters.
#[must_use]
pub fn sanitize_branch_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            last_was_dash = c == '-';
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    trimmed.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_forbidden_characters() {
        assert_eq!(sanitize_branch_name("feature/foo bar!"), "feature-foo-bar");
    }

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(sanitize_branch_name("--a///b--"), "a-b");
    }

    #[test]
    fn truncates_to_fifty_chars() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_branch_name(&long).len(), 50);
    }

    #[test]
    fn preserves_already_clean_names() {
        assert_eq!(sanitize_branch_name("123-feature_branch"), "123-feature_branch");
    }
}
