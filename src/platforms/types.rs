use crate::config::ConductorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One sample of the externally observable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollSignals {
    /// The page is still producing output.
    pub generating: bool,
    /// Raw text of the most recent response region.
    pub text: String,
}

/// Bounds used while driving a page's input surface.
#[derive(Debug, Clone, Copy)]
pub struct AdapterTiming {
    pub element_timeout: Duration,
    pub element_poll: Duration,
    pub settle_delay: Duration,
}

impl AdapterTiming {
    pub fn from_config(config: &ConductorConfig) -> Self {
        Self {
            element_timeout: config.element_timeout(),
            element_poll: config.element_poll(),
            settle_delay: config.settle_delay(),
        }
    }
}

impl Default for AdapterTiming {
    fn default() -> Self {
        Self::from_config(&ConductorConfig::default())
    }
}
