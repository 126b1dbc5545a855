pub mod bus;
pub mod types;

pub use bus::{InMemoryMessageBus, MessageBus, WorkerInbox};
pub use types::*;
