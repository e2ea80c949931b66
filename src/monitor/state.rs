use serde::Serialize;
use std::fmt;

/// Where the monitor is within a cycle.
///
/// A cycle walks `Idle -> Capturing -> Classifying -> Deciding -> Acting -> Idle`,
/// returning to `Idle` early when a step fails or nothing needs doing. `Stopped`
/// is terminal and only set by the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Capturing,
    Classifying,
    Deciding,
    Acting,
    Stopped,
}

/// Why the monitoring loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested
    Cancelled,
    /// The frame source closed or ran out of frames
    SourceClosed,
    /// Too many consecutive capture failures
    CaptureFailures(u32),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::SourceClosed => write!(f, "frame source closed"),
            StopReason::CaptureFailures(n) => write!(f, "{} consecutive capture failures", n),
        }
    }
}
