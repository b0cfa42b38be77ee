//! ABOUTME: Compaction Monitor: checks token usage against a threshold and, when crossed,
//! ABOUTME: invokes a summarizer persona to append a checkpoint

use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use wave_adapter::{Adapter, AdapterRunConfig, StreamEvent};
use wave_config::RelayConfig;
use wave_pipeline::{CompactionConfig, TemplateContext};

/// Decide whether `tokens_used` has crossed the compaction threshold.
/// A step-level `handover.compaction.trigger` (e.g. `"token_limit_80%"`)
/// overrides `runtime.relay.token_threshold_percent`.
#[must_use]
pub fn should_compact(
    compaction: &CompactionConfig,
    relay: &RelayConfig,
    tokens_used: u64,
    context_limit_tokens: u64,
) -> bool {
    if context_limit_tokens == 0 {
        return false;
    }
    let percent = compaction.trigger_percent().unwrap_or(relay.token_threshold_percent);
    let threshold = (context_limit_tokens as f64) * (f64::from(percent) / 100.0);
    (tokens_used as f64) >= threshold
}

/// Invokes a summarizer persona when token usage crosses the configured
/// threshold and appends its output to `checkpoint.md` in the step's
/// workspace. Compaction is best-effort: any failure is logged as a
/// warning and never propagated, since a missed checkpoint degrades context
/// quality but must never abort an otherwise-successful pipeline run.
pub struct CompactionMonitor {
    relay_config: RelayConfig,
    adapter: Arc<dyn Adapter>,
    adapter_binary: String,
}

impl CompactionMonitor {
    #[must_use]
    pub fn new(relay_config: RelayConfig, adapter: Arc<dyn Adapter>, adapter_binary: impl Into<String>) -> Self {
        Self {
            relay_config,
            adapter,
            adapter_binary: adapter_binary.into(),
        }
    }

    /// Run the full check-then-compact sequence for a step. Returns whether
    /// compaction actually ran.
    pub async fn maybe_compact(
        &self,
        step_id: &str,
        compaction: &CompactionConfig,
        tokens_used: u64,
        workspace_dir: &Path,
        template_ctx: &TemplateContext,
    ) -> bool {
        if !should_compact(
            compaction,
            &self.relay_config,
            tokens_used,
            self.relay_config.context_limit_tokens,
        ) {
            return false;
        }

        let persona = compaction
            .persona
            .clone()
            .unwrap_or_else(|| self.relay_config.default_persona.clone());

        let prompt = template_ctx.resolve_placeholders(
            "Summarize the work done so far in this workspace into a compact checkpoint \
             preserving open decisions, in-flight file paths, and next steps.",
        );

        let mut config = AdapterRunConfig::new(self.adapter_binary.clone(), persona.clone(), workspace_dir.to_path_buf(), prompt);
        config.output_format = "text".to_string();

        let result = self.adapter.run(config, Arc::new(|_: StreamEvent| {})).await;
        match result {
            Ok(outcome) => {
                if let Err(e) = append_checkpoint(workspace_dir, &outcome.result_content) {
                    warn!(step_id, error = %e, "compaction succeeded but checkpoint write failed");
                }
            }
            Err(e) => {
                warn!(step_id, error = %e, "compaction invocation failed, continuing without a checkpoint");
            }
        }
        true
    }
}

fn append_checkpoint(workspace_dir: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    let path = workspace_dir.join("checkpoint.md");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "\n---\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_adapter::{AdapterResult, MockAdapter};

    #[test]
    fn threshold_crossed_triggers_compaction() {
        let relay = RelayConfig::default();
        let compaction = CompactionConfig::default();
        assert!(should_compact(&compaction, &relay, 160_001, 200_000));
        assert!(!should_compact(&compaction, &relay, 100_000, 200_000));
    }

    #[test]
    fn step_level_trigger_overrides_runtime_default() {
        let relay = RelayConfig::default();
        let compaction = CompactionConfig {
            trigger: Some("token_limit_50%".to_string()),
            persona: None,
        };
        assert!(should_compact(&compaction, &relay, 100_001, 200_000));
    }

    #[tokio::test]
    async fn maybe_compact_appends_checkpoint_on_threshold_cross() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::new(|_cfg| Ok(AdapterResult::success("checkpoint summary"))));
        let monitor = CompactionMonitor::new(RelayConfig::default(), adapter, "claude");
        let ctx = TemplateContext::new("run1", "demo");
        let compaction = CompactionConfig::default();

        let ran = monitor
            .maybe_compact("s1", &compaction, 180_000, dir.path(), &ctx)
            .await;
        assert!(ran);
        let content = std::fs::read_to_string(dir.path().join("checkpoint.md")).unwrap();
        assert!(content.contains("checkpoint summary"));
    }

    #[tokio::test]
    async fn maybe_compact_appends_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("checkpoint.md"), "first\n").unwrap();
        let adapter = Arc::new(MockAdapter::new(|_cfg| Ok(AdapterResult::success("second"))));
        let monitor = CompactionMonitor::new(RelayConfig::default(), adapter, "claude");
        let ctx = TemplateContext::new("run1", "demo");
        let compaction = CompactionConfig::default();

        monitor
            .maybe_compact("s1", &compaction, 180_000, dir.path(), &ctx)
            .await;
        let content = std::fs::read_to_string(dir.path().join("checkpoint.md")).unwrap();
        assert!(content.starts_with("first"));
        assert!(content.contains("second"));
    }

    #[tokio::test]
    async fn below_threshold_does_not_invoke_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::new(|_cfg| panic!("adapter should not run")));
        let monitor = CompactionMonitor::new(RelayConfig::default(), adapter, "claude");
        let ctx = TemplateContext::new("run1", "demo");
        let compaction = CompactionConfig::default();

        let ran = monitor
            .maybe_compact("s1", &compaction, 10_000, dir.path(), &ctx)
            .await;
        assert!(!ran);
    }
}
