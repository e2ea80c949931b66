mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::BowlwatchApp;
pub use state::ComponentRegistry;
pub use types::{ComponentState, ShutdownReason};
