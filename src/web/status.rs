use crate::events::{BowlEvent, MonitorEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Monitor status as seen from the event bus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewerStatus {
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_detected: Option<BowlEvent>,
    pub last_error: Option<String>,
    pub last_fired: Option<BowlEvent>,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub consecutive_capture_failures: u32,
    pub stopped: Option<String>,
}

impl ViewerStatus {
    pub fn apply(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::CycleCompleted { result } => {
                self.cycles += 1;
                self.last_cycle_at = Some(result.timestamp);
                self.last_detected = result.event_detected;
                self.last_error = result.error.as_ref().map(|e| e.to_string());
                if result.frame_captured {
                    self.consecutive_capture_failures = 0;
                }
            }
            MonitorEvent::BowlEventFired { event, timestamp } => {
                self.last_fired = Some(*event);
                self.last_fired_at = Some(*timestamp);
            }
            MonitorEvent::CaptureFailed { consecutive } => {
                self.consecutive_capture_failures = *consecutive;
            }
            MonitorEvent::MonitorStopped { reason } => {
                self.stopped = Some(reason.to_string());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.stopped.is_none()
    }
}
