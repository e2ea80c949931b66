use crate::monitor::StopReason;
use serde::Serialize;
use std::fmt;

/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    MonitorStopped(StopReason),
}

impl ShutdownReason {
    /// Process exit code for this shutdown
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::MonitorStopped(StopReason::CaptureFailures(_)) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(signal) => write!(f, "received {}", signal),
            ShutdownReason::MonitorStopped(reason) => write!(f, "monitor stopped: {}", reason),
        }
    }
}
