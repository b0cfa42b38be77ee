//! ABOUTME: Input sanitizer interface used by the Step Runner's prompt builder
//! ABOUTME: Critical violations are replaced with a sentinel rather than aborting the step

use tracing::warn;

/// Outcome of sanitizing a piece of untrusted input destined for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    /// Input passed through unchanged (or with benign normalization).
    Clean(String),
    /// A critical violation was found; `reason` is logged and `sentinel`
    /// substituted in the prompt in place of the offending input.
    Sentinel { sentinel: String, reason: String },
}

impl SanitizeOutcome {
    /// Resolve to the text that should actually be substituted into the prompt.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Clean(s) => s,
            Self::Sentinel { sentinel, .. } => sentinel,
        }
    }
}

/// Sanitizes free-form text before it is embedded into an agent prompt.
pub trait InputSanitizer: Send + Sync {
    fn sanitize(&self, input: &str) -> SanitizeOutcome;
}

/// Strips ASCII control characters (other than newline/tab) and rejects
/// inputs containing a null byte or an embedded prompt-delimiter escape
/// (`--- PIPELINE ---` / `--- SCHEMAS ---`), which would otherwise let a
/// malicious `{{ input }}` value forge meta-pipeline output framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInputSanitizer;

const FORBIDDEN_MARKERS: &[&str] = &["--- PIPELINE ---", "--- SCHEMAS ---"];

impl InputSanitizer for DefaultInputSanitizer {
    fn sanitize(&self, input: &str) -> SanitizeOutcome {
        if input.contains('\0') {
            warn!("input sanitizer: rejected input containing a null byte");
            return SanitizeOutcome::Sentinel {
                sentinel: "[REDACTED: invalid input]".to_string(),
                reason: "null byte".to_string(),
            };
        }
        for marker in FORBIDDEN_MARKERS {
            if input.contains(marker) {
                warn!(marker, "input sanitizer: rejected input containing a reserved marker");
                return SanitizeOutcome::Sentinel {
                    sentinel: "[REDACTED: reserved marker]".to_string(),
                    reason: format!("contains reserved marker {marker}"),
                };
            }
        }
        let cleaned: String = input
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();
        SanitizeOutcome::Clean(cleaned)
    }
}
