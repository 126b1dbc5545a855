pub mod detector;
pub mod service;

pub use detector::{normalize_whitespace, CompletionDetector, PollOutcome};
pub use service::WorkerService;
