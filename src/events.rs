use crate::monitor::{MonitoringResult, StopReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Discrete interpretation of the bowl state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BowlEvent {
    /// Food in the bowl is all gone
    BowlEmpty,
    /// The bowl has been filled up
    BowlRefilled,
    /// Some food was eaten but the bowl is not empty
    PartiallyEaten,
}

impl BowlEvent {
    /// Stable identifier used in logs and the event history
    pub fn event_type(&self) -> &'static str {
        match self {
            BowlEvent::BowlEmpty => "bowl_empty",
            BowlEvent::BowlRefilled => "bowl_refilled",
            BowlEvent::PartiallyEaten => "partially_eaten",
        }
    }

    /// Human-readable description used in notifications
    pub fn description(&self) -> &'static str {
        match self {
            BowlEvent::BowlEmpty => "food in the bowl is all gone",
            BowlEvent::BowlRefilled => "food bowl has been refilled",
            BowlEvent::PartiallyEaten => "some of the food was eaten but not all of it",
        }
    }
}

impl fmt::Display for BowlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Events published by the monitoring loop for observers
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A cycle finished, successfully or with a reported error
    CycleCompleted { result: MonitoringResult },
    /// A bowl event passed the debounce policy and was notified and logged
    BowlEventFired {
        event: BowlEvent,
        timestamp: DateTime<Utc>,
    },
    /// Frame capture failed
    CaptureFailed { consecutive: u32 },
    /// The monitoring loop reached its terminal state
    MonitorStopped { reason: StopReason },
}

impl MonitorEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::CycleCompleted { .. } => "cycle_completed",
            MonitorEvent::BowlEventFired { .. } => "bowl_event_fired",
            MonitorEvent::CaptureFailed { .. } => "capture_failed",
            MonitorEvent::MonitorStopped { .. } => "monitor_stopped",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::CycleCompleted { result } => match (&result.event_detected, &result.error)
            {
                (_, Some(error)) => format!("Cycle completed with error: {}", error),
                (Some(event), None) => format!("Cycle completed, detected: {}", event),
                (None, None) => "Cycle completed, nothing detected".to_string(),
            },
            MonitorEvent::BowlEventFired { event, .. } => format!("Event fired: {}", event),
            MonitorEvent::CaptureFailed { consecutive } => {
                format!("Capture failed ({} consecutive)", consecutive)
            }
            MonitorEvent::MonitorStopped { reason } => format!("Monitor stopped: {}", reason),
        }
    }
}

/// Broadcast bus carrying [`MonitorEvent`]s to observers such as the web viewer
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let mut bus = Self::new(capacity);
        bus.debug_logging = true;
        bus
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it.
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        match &event {
            MonitorEvent::BowlEventFired { event, .. } => {
                info!("Bowl event fired: {}", event.event_type());
            }
            MonitorEvent::CaptureFailed { consecutive } => {
                warn!("Capture failed ({} consecutive)", consecutive);
            }
            MonitorEvent::MonitorStopped { reason } => {
                info!("Monitor stopped: {}", reason);
            }
            MonitorEvent::CycleCompleted { result } => {
                if let Some(error) = &result.error {
                    error!("Cycle error: {}", error);
                } else if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bowl_event_identifiers() {
        assert_eq!(BowlEvent::BowlEmpty.event_type(), "bowl_empty");
        assert_eq!(BowlEvent::BowlRefilled.event_type(), "bowl_refilled");
        assert_eq!(BowlEvent::PartiallyEaten.event_type(), "partially_eaten");
        assert_eq!(
            serde_json::to_string(&BowlEvent::PartiallyEaten).unwrap(),
            "\"partially_eaten\""
        );
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(MonitorEvent::CaptureFailed { consecutive: 2 });
        assert_eq!(delivered, 1);

        match receiver.recv().await.unwrap() {
            MonitorEvent::CaptureFailed { consecutive } => assert_eq!(consecutive, 2),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(MonitorEvent::MonitorStopped {
                reason: StopReason::Cancelled
            }),
            0
        );
    }
}
