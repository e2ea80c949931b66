use super::state::CyclePhase;
use crate::camera::FrameSource;
use crate::classifier::EventClassifier;
use crate::debounce::{DebouncePolicy, DebounceState};
use crate::error::{BowlwatchError, Result};
use crate::events::BowlEvent;
use crate::history::EventLog;
use crate::notify::NotificationSink;
use crate::vision::DescriptionProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Failure of one cycle step. Reported in [`MonitoringResult::error`], never
/// returned as an `Err` from a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// The frame source returned not-ok or no frame
    #[error("capture failed")]
    Capture { details: String, recoverable: bool },

    /// Describing or classifying the frame failed
    #[error("classification failed: {0}")]
    Classification(String),

    /// Notifying or logging a warranted event failed
    #[error("action failed: {0}")]
    Action(String),
}

/// Outcome of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringResult {
    pub event_detected: Option<BowlEvent>,
    pub frame_captured: bool,
    pub timestamp: DateTime<Utc>,
    pub error: Option<CycleError>,
    /// Whether a notification was sent and logged this cycle
    pub acted: bool,
}

impl MonitoringResult {
    fn capture_failed(timestamp: DateTime<Utc>, details: String, recoverable: bool) -> Self {
        Self {
            event_detected: None,
            frame_captured: false,
            timestamp,
            error: Some(CycleError::Capture {
                details,
                recoverable,
            }),
            acted: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs capture -> describe -> classify -> decide -> act, one frame at a time.
///
/// Owns the debounce state of one monitored bowl.
pub struct MonitoringCycle {
    describer: Arc<dyn DescriptionProvider>,
    classifier: EventClassifier,
    policy: DebouncePolicy,
    notifier: Arc<dyn NotificationSink>,
    event_log: Arc<dyn EventLog>,
    subject_prefix: String,
    state: DebounceState,
    phase: CyclePhase,
}

impl MonitoringCycle {
    pub fn builder() -> MonitoringCycleBuilder {
        MonitoringCycleBuilder::new()
    }

    /// Run one cycle stamped with the current time
    pub async fn run(&mut self, source: &mut dyn FrameSource) -> MonitoringResult {
        self.run_at(source, Utc::now()).await
    }

    /// Run one cycle stamped with `timestamp`
    pub async fn run_at(
        &mut self,
        source: &mut dyn FrameSource,
        timestamp: DateTime<Utc>,
    ) -> MonitoringResult {
        self.set_phase(CyclePhase::Capturing);
        let frame = match source.read().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                warn!("Frame source {} returned no frame", source.name());
                self.set_phase(CyclePhase::Idle);
                return MonitoringResult::capture_failed(timestamp, "no frame".to_string(), true);
            }
            Err(e) => {
                let recoverable = e.is_recoverable();
                if recoverable {
                    warn!("Failed to capture frame from {}: {}", source.name(), e);
                } else {
                    error!("Frame source {} failed: {}", source.name(), e);
                }
                self.set_phase(CyclePhase::Idle);
                return MonitoringResult::capture_failed(timestamp, e.to_string(), recoverable);
            }
        };

        self.set_phase(CyclePhase::Classifying);
        let event = match self.describer.describe(&frame).await {
            Ok(description) => {
                debug!("Frame {} description: {}", frame.id, description.trim());
                self.classifier.classify(&description)
            }
            Err(e) => {
                error!("Failed to describe frame {}: {}", frame.id, e);
                self.set_phase(CyclePhase::Idle);
                return MonitoringResult {
                    event_detected: None,
                    frame_captured: true,
                    timestamp,
                    error: Some(CycleError::Classification(e.to_string())),
                    acted: false,
                };
            }
        };

        self.set_phase(CyclePhase::Deciding);
        let warranted = self.policy.should_act(event, timestamp, &self.state);

        let mut result = MonitoringResult {
            event_detected: event,
            frame_captured: true,
            timestamp,
            error: None,
            acted: false,
        };

        let Some(event) = event.filter(|_| warranted) else {
            if let Some(event) = event {
                debug!("{} suppressed by debounce window", event.event_type());
            }
            self.set_phase(CyclePhase::Idle);
            return result;
        };

        self.set_phase(CyclePhase::Acting);
        match self.act(event, timestamp).await {
            Ok(()) => {
                self.state.record(event, timestamp);
                result.acted = true;
                info!("Event detected and handled: {}", event.event_type());
            }
            Err(e) => {
                // State stays stale so the next cycle retries this event
                error!("Failed to handle event {}: {}", event.event_type(), e);
                result.error = Some(CycleError::Action(e.to_string()));
            }
        }

        self.set_phase(CyclePhase::Idle);
        result
    }

    async fn act(&self, event: BowlEvent, timestamp: DateTime<Utc>) -> Result<()> {
        let subject = format!("{}: {}", self.subject_prefix, event);
        let body = format!("An event has been detected: {}", event);

        self.notifier.notify(&subject, &body).await?;
        self.event_log.append(event, timestamp).await?;
        Ok(())
    }

    fn set_phase(&mut self, phase: CyclePhase) {
        trace!("Cycle phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.set_phase(CyclePhase::Stopped);
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn policy(&self) -> &DebouncePolicy {
        &self.policy
    }
}

/// Builder for [`MonitoringCycle`]
pub struct MonitoringCycleBuilder {
    describer: Option<Arc<dyn DescriptionProvider>>,
    classifier: Option<EventClassifier>,
    notifier: Option<Arc<dyn NotificationSink>>,
    event_log: Option<Arc<dyn EventLog>>,
    debounce_window: Duration,
    subject_prefix: String,
}

impl MonitoringCycleBuilder {
    pub fn new() -> Self {
        Self {
            describer: None,
            classifier: None,
            notifier: None,
            event_log: None,
            debounce_window: DebouncePolicy::DEFAULT_WINDOW,
            subject_prefix: "Pet Food Alert".to_string(),
        }
    }

    pub fn describer(mut self, describer: Arc<dyn DescriptionProvider>) -> Self {
        self.describer = Some(describer);
        self
    }

    /// Defaults to the built-in keyword rules
    pub fn classifier(mut self, classifier: EventClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn subject_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<MonitoringCycle> {
        let describer = self
            .describer
            .ok_or_else(|| BowlwatchError::system("Description provider is required"))?;
        let notifier = self
            .notifier
            .ok_or_else(|| BowlwatchError::system("Notification sink is required"))?;
        let event_log = self
            .event_log
            .ok_or_else(|| BowlwatchError::system("Event log is required"))?;

        Ok(MonitoringCycle {
            describer,
            classifier: self.classifier.unwrap_or_default(),
            policy: DebouncePolicy::new(self.debounce_window),
            notifier,
            event_log,
            subject_prefix: self.subject_prefix,
            state: DebounceState::default(),
            phase: CyclePhase::Idle,
        })
    }
}

impl Default for MonitoringCycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
