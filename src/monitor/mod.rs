//! Monitoring core: one capture/classify/decide/act cycle and the loop driving it

pub mod cycle;
pub mod runner;
pub mod state;

#[cfg(test)]
mod tests;

pub use cycle::{CycleError, MonitoringCycle, MonitoringCycleBuilder, MonitoringResult};
pub use runner::{MonitorRunner, MonitorStats};
pub use state::{CyclePhase, StopReason};
