use super::{AdapterTiming, ChatGptAdapter, ClaudeAdapter, PlatformAdapter};
use crate::config::ConductorConfig;
use crate::registry::TargetId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Fixed table of platform adapters, built once at startup.
pub struct PlatformRegistry {
    adapters: BTreeMap<TargetId, Arc<dyn PlatformAdapter>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// ChatGPT and Claude, timed from `config`.
    pub fn with_defaults(config: &ConductorConfig) -> Self {
        let timing = AdapterTiming::from_config(config);
        Self::new()
            .with_adapter(Arc::new(ChatGptAdapter::new(timing)))
            .with_adapter(Arc::new(ClaudeAdapter::new(timing)))
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        info!(platform = %adapter.target(), "platform adapter registered");
        self.adapters.insert(adapter.target().clone(), adapter);
        self
    }

    pub fn get(&self, target: &TargetId) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(target).cloned()
    }

    pub fn contains(&self, target: &TargetId) -> bool {
        self.adapters.contains_key(target)
    }

    /// Target whose identity predicate accepts `host`, in target order.
    pub fn identify(&self, host: &str) -> Option<TargetId> {
        self.adapters
            .values()
            .find(|adapter| adapter.matches_identity(host))
            .map(|adapter| adapter.target().clone())
    }

    pub fn targets(&self) -> Vec<TargetId> {
        self.adapters.keys().cloned().collect()
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_defaults(&ConductorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_platforms() {
        let platforms = PlatformRegistry::default();
        assert_eq!(
            platforms.targets(),
            vec![TargetId::from("chatgpt"), TargetId::from("claude")]
        );
        assert!(platforms.get(&TargetId::from("gemini")).is_none());
    }

    #[test]
    fn test_identify_by_host() {
        let platforms = PlatformRegistry::default();
        assert_eq!(platforms.identify("chat.openai.com"), Some(TargetId::from("chatgpt")));
        assert_eq!(platforms.identify("console.anthropic.com"), Some(TargetId::from("claude")));
        assert_eq!(platforms.identify("example.org"), None);
    }
}
