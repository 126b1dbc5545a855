use super::{wait_for_element, AdapterTiming, PageSurface, PlatformAdapter, PollSignals};
use crate::error::{PageError, WorkerError};
use crate::registry::TargetId;
use async_trait::async_trait;
use tracing::debug;

pub const INPUT: &str = r#"textarea[placeholder="Ask anything"]"#;
pub const SEND_BUTTON: &str = r#"button[data-testid="send-button"]"#;
pub const RESPONSE_TEXT: &str = r#"[data-message-author-role="assistant"] .markdown"#;

/// ChatGPT: the send button disappears while a reply is streaming.
pub struct ChatGptAdapter {
    target: TargetId,
    timing: AdapterTiming,
}

impl ChatGptAdapter {
    pub fn new(timing: AdapterTiming) -> Self {
        Self {
            target: TargetId::from("chatgpt"),
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
impl PlatformAdapter for ChatGptAdapter {
    fn target(&self) -> &TargetId {
        &self.target
    }

    fn domains(&self) -> &[&'static str] {
        &["chatgpt.com", "chat.openai.com"]
    }

    async fn submit(&self, page: &dyn PageSurface, prompt: &str) -> Result<(), WorkerError> {
        wait_for_element(page, INPUT, &self.timing)
            .await
            .map_err(|_| self.submission_failed("ChatGPT textarea not found"))?;

        page.insert_text(INPUT, prompt)
            .await
            .map_err(|e| self.submission_failed(format!("failed to fill prompt: {}", e)))?;

        // The UI enables the send button only after it has seen the input.
        tokio::time::sleep(self.timing.settle_delay).await;

        if page.is_enabled(SEND_BUTTON).await.unwrap_or(false) {
            debug!(platform = %self.target, "submitting via send button");
            return page
                .click(SEND_BUTTON)
                .await
                .map_err(|e| self.submission_failed(format!("send button click failed: {}", e)));
        }

        if page.exists(INPUT).await.unwrap_or(false) {
            debug!(platform = %self.target, "submitting via Enter key");
            return page
                .press_enter(INPUT)
                .await
                .map_err(|e| self.submission_failed(format!("Enter key dispatch failed: {}", e)));
        }

        Err(self.submission_failed("Could not find a method to submit for ChatGPT"))
    }

    async fn poll_signals(&self, page: &dyn PageSurface) -> Result<PollSignals, PageError> {
        let generating = !page.exists(SEND_BUTTON).await?;
        let text = page.last_text(RESPONSE_TEXT).await?.unwrap_or_default();
        Ok(PollSignals { generating, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mocks::FakePage;

    fn adapter() -> ChatGptAdapter {
        ChatGptAdapter::new(AdapterTiming::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_prefers_send_button() {
        let page = FakePage::new()
            .with_element(INPUT)
            .with_element(SEND_BUTTON);

        adapter().submit(&page, "What is 6 x 7?").await.unwrap();

        assert_eq!(page.text_of(INPUT).as_deref(), Some("What is 6 x 7?"));
        assert_eq!(
            page.actions(),
            vec![format!("insert {}", INPUT), format!("click {}", SEND_BUTTON)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_falls_back_to_enter_when_button_disabled() {
        let page = FakePage::new()
            .with_element(INPUT)
            .with_disabled_element(SEND_BUTTON);

        adapter().submit(&page, "hello").await.unwrap();

        assert_eq!(page.actions().last(), Some(&format!("enter {}", INPUT)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_fails_without_input() {
        let page = FakePage::new().with_element(SEND_BUTTON);

        let err = adapter().submit(&page, "hello").await.unwrap_err();

        assert!(matches!(err, WorkerError::SubmissionFailed { .. }));
        assert!(page.actions().is_empty());
    }

    #[tokio::test]
    async fn test_generating_while_send_button_missing() {
        let page = FakePage::new().with_text(RESPONSE_TEXT, "partial");

        let signals = adapter().poll_signals(&page).await.unwrap();
        assert!(signals.generating);
        assert_eq!(signals.text, "partial");

        page.add_element(SEND_BUTTON);
        let signals = adapter().poll_signals(&page).await.unwrap();
        assert!(!signals.generating);
    }
}
