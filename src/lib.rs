pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod platforms;
pub mod registry;
pub mod store;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use config::ConductorConfig;
pub use coordinator::{Coordinator, Outcome, WorkflowId, WorkflowRequest, WorkflowResult};
pub use error::ErrorKind;
pub use local_test::{LocalTestMode, SimulatedBehaviour};
