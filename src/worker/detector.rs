use crate::config::ConductorConfig;
use crate::error::PageError;
use crate::platforms::PollSignals;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Whitespace-normalised response text.
    Complete(String),
    TimedOut { elapsed: Duration, samples: u32 },
}

/// Bounded polling state machine deciding when a session has finished
/// producing its reply.
///
/// A sample counts as complete only when the generating indicator is off and
/// the extracted text is longer than `min_content_len`, both read in the same
/// sample. Sampling errors count as "not yet"; only the deadline ends the loop.
#[derive(Debug, Clone, Copy)]
pub struct CompletionDetector {
    interval: Duration,
    min_content_len: usize,
}

/// Transient per-await state.
struct PollState {
    started_at: Instant,
    deadline: Instant,
}

impl CompletionDetector {
    pub fn new(interval: Duration, min_content_len: usize) -> Self {
        Self {
            interval,
            min_content_len,
        }
    }

    pub fn from_config(config: &ConductorConfig) -> Self {
        Self::new(config.poll_interval(), config.min_content_len)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_complete(&self, signals: &PollSignals) -> bool {
        !signals.generating && signals.text.trim().chars().count() > self.min_content_len
    }

    pub async fn run<F, Fut>(&self, timeout: Duration, mut sample: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollSignals, PageError>>,
    {
        let started_at = Instant::now();
        let state = PollState {
            started_at,
            deadline: started_at + timeout,
        };
        let mut samples = 0u32;

        while Instant::now() < state.deadline {
            samples += 1;
            // A stalled page must not hold the await past its deadline.
            let Ok(sampled) = timeout_at(state.deadline, sample()).await else {
                debug!(samples, "sample stalled until the deadline");
                break;
            };
            match sampled {
                Ok(signals) if self.is_complete(&signals) => {
                    debug!(
                        samples,
                        elapsed_ms = state.started_at.elapsed().as_millis() as u64,
                        "response complete"
                    );
                    return PollOutcome::Complete(normalize_whitespace(&signals.text));
                }
                Ok(signals) => {
                    trace!(
                        generating = signals.generating,
                        len = signals.text.len(),
                        "response not complete"
                    );
                }
                Err(e) => {
                    trace!(error = %e, "sample failed, treating as not complete");
                }
            }

            let next = Instant::now() + self.interval;
            sleep_until(next.min(state.deadline)).await;
        }

        PollOutcome::TimedOut {
            elapsed: state.started_at.elapsed(),
            samples,
        }
    }
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self::from_config(&ConductorConfig::default())
    }
}

/// Collapse whitespace runs to single spaces and trim both ends.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
