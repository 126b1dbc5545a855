pub mod chatgpt;
pub mod claude;
pub mod registry;
pub mod types;

use async_trait::async_trait;
use tokio::time::{sleep, timeout_at, Instant};

use crate::error::{PageError, WorkerError};
use crate::registry::TargetId;
pub use chatgpt::ChatGptAdapter;
pub use claude::ClaudeAdapter;
pub use registry::PlatformRegistry;
pub use types::*;

/// The external page a session renders, addressed by CSS selectors.
///
/// Implementations sit on the far side of the isolation boundary (a browser
/// automation channel, a content script, or the in-process simulation).
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// At least one element matches `selector`.
    async fn exists(&self, selector: &str) -> Result<bool, PageError>;

    /// The first match exists and is not disabled.
    async fn is_enabled(&self, selector: &str) -> Result<bool, PageError>;

    /// Replace the content of the first match and fire its input event.
    async fn insert_text(&self, selector: &str, text: &str) -> Result<(), PageError>;

    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Dispatch a synthetic Enter keydown on the first match.
    async fn press_enter(&self, selector: &str) -> Result<(), PageError>;

    /// Rendered text of the last element matching `selector`.
    async fn last_text(&self, selector: &str) -> Result<Option<String>, PageError>;
}

/// Per-platform behaviour: identity, prompt submission, completion signals.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn target(&self) -> &TargetId;

    /// Domains this platform is served from.
    fn domains(&self) -> &[&'static str];

    /// Exact domain or subdomain match.
    fn matches_identity(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains().iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Inject `prompt` and trigger the send action. Does not confirm delivery.
    async fn submit(&self, page: &dyn PageSurface, prompt: &str) -> Result<(), WorkerError>;

    /// Sample the generating indicator and the latest response text.
    async fn poll_signals(&self, page: &dyn PageSurface) -> Result<PollSignals, PageError>;
}

/// Poll until `selector` exists, bounded by `timing.element_timeout`.
pub async fn wait_for_element(
    page: &dyn PageSurface,
    selector: &str,
    timing: &AdapterTiming,
) -> Result<(), PageError> {
    wait_until(selector, timing, move || page.exists(selector)).await
}

/// Poll until `selector` exists and is enabled, bounded by `timing.element_timeout`.
pub async fn wait_for_enabled(
    page: &dyn PageSurface,
    selector: &str,
    timing: &AdapterTiming,
) -> Result<(), PageError> {
    wait_until(selector, timing, move || page.is_enabled(selector)).await
}

async fn wait_until<F, Fut>(
    selector: &str,
    timing: &AdapterTiming,
    mut probe: F,
) -> Result<(), PageError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool, PageError>>,
{
    let deadline = Instant::now() + timing.element_timeout;

    loop {
        match timeout_at(deadline, probe()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => {}
            Ok(Err(PageError::Detached)) => return Err(PageError::Detached),
            // Markup not there yet; keep looking until the deadline.
            Ok(Err(_)) => {}
            Err(_) => return Err(PageError::NotFound(selector.to_string())),
        }

        if Instant::now() + timing.element_poll > deadline {
            return Err(PageError::NotFound(selector.to_string()));
        }
        sleep(timing.element_poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConductorConfig;
    use std::time::Duration;

    /// Page whose every query hangs.
    struct StalledPage;

    #[async_trait]
    impl PageSurface for StalledPage {
        async fn exists(&self, _selector: &str) -> Result<bool, PageError> {
            std::future::pending().await
        }

        async fn is_enabled(&self, _selector: &str) -> Result<bool, PageError> {
            std::future::pending().await
        }

        async fn insert_text(&self, _selector: &str, _text: &str) -> Result<(), PageError> {
            std::future::pending().await
        }

        async fn click(&self, _selector: &str) -> Result<(), PageError> {
            std::future::pending().await
        }

        async fn press_enter(&self, _selector: &str) -> Result<(), PageError> {
            std::future::pending().await
        }

        async fn last_text(&self, _selector: &str) -> Result<Option<String>, PageError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_element_wait_is_bounded_when_page_stalls() {
        let timing = AdapterTiming::default();
        let started = Instant::now();

        let err = wait_for_element(&StalledPage, "div.ProseMirror", &timing)
            .await
            .unwrap_err();

        assert!(matches!(err, PageError::NotFound(_)));
        assert_eq!(started.elapsed(), timing.element_timeout);
        assert!(started.elapsed() < Duration::from_millis(3_500));
    }

    #[test]
    fn test_identity_matches_domain_family() {
        let chatgpt = ChatGptAdapter::new(AdapterTiming::from_config(&ConductorConfig::default()));

        assert!(chatgpt.matches_identity("chatgpt.com"));
        assert!(chatgpt.matches_identity("chat.openai.com"));
        assert!(chatgpt.matches_identity("www.chatgpt.com"));
        assert!(chatgpt.matches_identity("ChatGPT.com."));
        assert!(!chatgpt.matches_identity("notchatgpt.com"));
        assert!(!chatgpt.matches_identity("chatgpt.com.evil.net"));
        assert!(!chatgpt.matches_identity("claude.ai"));
    }
}
