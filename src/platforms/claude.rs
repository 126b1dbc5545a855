use super::{
    wait_for_element, wait_for_enabled, AdapterTiming, PageSurface, PlatformAdapter, PollSignals,
};
use crate::error::{PageError, WorkerError};
use crate::registry::TargetId;
use async_trait::async_trait;
use tracing::{debug, warn};

pub const INPUT: &str = "div.ProseMirror";
pub const SEND_BUTTON: &str = r#"button[aria-label="Send Message"]"#;
pub const STOP_BUTTON: &str = r#"button[aria-label="Stop generating"]"#;
pub const RESPONSE_TEXT: &str = "[data-message-id]:last-of-type .font-claude-message";

/// Claude: a "Stop generating" button is shown while a reply is streaming.
pub struct ClaudeAdapter {
    target: TargetId,
    timing: AdapterTiming,
}

impl ClaudeAdapter {
    pub fn new(timing: AdapterTiming) -> Self {
        Self {
            target: TargetId::from("claude"),
            timing,
        }
    }

    fn submission_failed(&self, reason: impl Into<String>) -> WorkerError {
        WorkerError::SubmissionFailed {
            target: self.target.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for ClaudeAdapter {
    fn target(&self) -> &TargetId {
        &self.target
    }

    fn domains(&self) -> &[&'static str] {
        &["claude.ai", "console.anthropic.com"]
    }

    async fn submit(&self, page: &dyn PageSurface, prompt: &str) -> Result<(), WorkerError> {
        wait_for_element(page, INPUT, &self.timing)
            .await
            .map_err(|_| self.submission_failed("Claude input area not found"))?;

        page.insert_text(INPUT, prompt)
            .await
            .map_err(|e| self.submission_failed(format!("failed to fill prompt: {}", e)))?;

        tokio::time::sleep(self.timing.settle_delay).await;

        // The editor enables its send button asynchronously.
        match wait_for_enabled(page, SEND_BUTTON, &self.timing).await {
            Ok(()) => {
                debug!(platform = %self.target, "submitting via send button");
                page.click(SEND_BUTTON)
                    .await
                    .map_err(|e| self.submission_failed(format!("send button click failed: {}", e)))
            }
            Err(e) => {
                warn!(
                    platform = %self.target,
                    error = %e,
                    "send button unavailable, falling back to Enter key"
                );
                if !page.exists(INPUT).await.unwrap_or(false) {
                    return Err(self.submission_failed(
                        "Claude submit button not found or not enabled",
                    ));
                }
                page.press_enter(INPUT).await.map_err(|e| {
                    self.submission_failed(format!("Enter key dispatch failed: {}", e))
                })
            }
        }
    }

    async fn poll_signals(&self, page: &dyn PageSurface) -> Result<PollSignals, PageError> {
        let generating = page.exists(STOP_BUTTON).await?;
        let text = page.last_text(RESPONSE_TEXT).await?.unwrap_or_default();
        Ok(PollSignals { generating, text })
    }
}
