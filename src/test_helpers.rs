#[cfg(test)]
pub mod mocks {
    use crate::error::{PageError, WorkerError};
    use crate::platforms::{PageSurface, PlatformAdapter, PollSignals};
    use crate::registry::TargetId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default)]
    struct Element {
        enabled: bool,
        text: Option<String>,
    }

    #[derive(Default)]
    struct PageState {
        elements: HashMap<String, Element>,
        actions: Vec<String>,
        stalled: bool,
    }

    /// Scriptable page keyed by selector. Clones share state, so a test can
    /// keep a handle while a worker owns another.
    #[derive(Clone, Default)]
    pub struct FakePage {
        state: Arc<Mutex<PageState>>,
    }

    impl FakePage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_element(self, selector: &str) -> Self {
            self.add_element(selector);
            self
        }

        pub fn with_disabled_element(self, selector: &str) -> Self {
            self.state.lock().unwrap().elements.insert(
                selector.to_string(),
                Element {
                    enabled: false,
                    text: None,
                },
            );
            self
        }

        pub fn with_text(self, selector: &str, text: &str) -> Self {
            self.state
                .lock()
                .unwrap()
                .elements
                .entry(selector.to_string())
                .or_insert(Element {
                    enabled: true,
                    text: None,
                })
                .text = Some(text.to_string());
            self
        }

        /// Page actions hang forever; queries still answer.
        pub fn stalled(self) -> Self {
            self.state.lock().unwrap().stalled = true;
            self
        }

        pub fn add_element(&self, selector: &str) {
            self.state.lock().unwrap().elements.insert(
                selector.to_string(),
                Element {
                    enabled: true,
                    text: None,
                },
            );
        }

        pub fn remove_element(&self, selector: &str) {
            self.state.lock().unwrap().elements.remove(selector);
        }

        pub fn text_of(&self, selector: &str) -> Option<String> {
            self.state
                .lock()
                .unwrap()
                .elements
                .get(selector)
                .and_then(|e| e.text.clone())
        }

        pub fn actions(&self) -> Vec<String> {
            self.state.lock().unwrap().actions.clone()
        }

        async fn act(&self, verb: &str, selector: &str) -> Result<(), PageError> {
            let stalled = self.state.lock().unwrap().stalled;
            if stalled {
                std::future::pending::<()>().await;
            }
            let mut state = self.state.lock().unwrap();
            if !state.elements.contains_key(selector) {
                return Err(PageError::NotFound(selector.to_string()));
            }
            state.actions.push(format!("{} {}", verb, selector));
            Ok(())
        }
    }

    #[async_trait]
    impl PageSurface for FakePage {
        async fn exists(&self, selector: &str) -> Result<bool, PageError> {
            Ok(self.state.lock().unwrap().elements.contains_key(selector))
        }

        async fn is_enabled(&self, selector: &str) -> Result<bool, PageError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .elements
                .get(selector)
                .is_some_and(|e| e.enabled))
        }

        async fn insert_text(&self, selector: &str, text: &str) -> Result<(), PageError> {
            self.act("insert", selector).await?;
            if let Some(element) = self.state.lock().unwrap().elements.get_mut(selector) {
                element.text = Some(text.to_string());
            }
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<(), PageError> {
            self.act("click", selector).await
        }

        async fn press_enter(&self, selector: &str) -> Result<(), PageError> {
            self.act("enter", selector).await
        }

        async fn last_text(&self, selector: &str) -> Result<Option<String>, PageError> {
            Ok(self.text_of(selector))
        }
    }

    /// Adapter whose every operation panics, for isolation tests.
    pub struct PanickingAdapter {
        target: TargetId,
    }

    impl PanickingAdapter {
        pub fn new(target: &str) -> Self {
            Self {
                target: TargetId::from(target),
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for PanickingAdapter {
        fn target(&self) -> &TargetId {
            &self.target
        }

        fn domains(&self) -> &[&'static str] {
            &[]
        }

        async fn submit(&self, _page: &dyn PageSurface, _prompt: &str) -> Result<(), WorkerError> {
            panic!("adapter exploded during submit");
        }

        async fn poll_signals(&self, _page: &dyn PageSurface) -> Result<PollSignals, PageError> {
            panic!("adapter exploded during poll");
        }
    }
}
