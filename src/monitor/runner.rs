use super::cycle::{CycleError, MonitoringCycle, MonitoringResult};
use super::state::{CyclePhase, StopReason};
use crate::camera::FrameSource;
use crate::events::{BowlEvent, EventBus, MonitorEvent};
use crate::recovery::{RecoveryAction, RecoveryConfig, RecoveryManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CAPTURE_COMPONENT: &str = "capture";

/// Counters kept across cycles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub cycles: u64,
    pub frames_captured: u64,
    pub events_detected: u64,
    pub actions_fired: u64,
    pub capture_failures: u64,
    pub classification_failures: u64,
    pub action_failures: u64,
    pub last_event: Option<BowlEvent>,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl MonitorStats {
    fn record(&mut self, result: &MonitoringResult) {
        self.cycles += 1;
        self.last_cycle_at = Some(result.timestamp);

        if result.frame_captured {
            self.frames_captured += 1;
        }
        if result.event_detected.is_some() {
            self.events_detected += 1;
        }
        if result.acted {
            self.actions_fired += 1;
            self.last_event = result.event_detected;
        }

        match result.error {
            Some(CycleError::Capture { .. }) => self.capture_failures += 1,
            Some(CycleError::Classification(_)) => self.classification_failures += 1,
            Some(CycleError::Action(_)) => self.action_failures += 1,
            None => {}
        }
    }
}

/// Drives a [`MonitoringCycle`] against one frame source until cancelled,
/// the source closes, or capture keeps failing.
pub struct MonitorRunner {
    cycle: MonitoringCycle,
    source: Box<dyn FrameSource>,
    poll_interval: Duration,
    recovery: RecoveryManager,
    event_bus: Arc<EventBus>,
    stats: MonitorStats,
    pending_stop: Option<StopReason>,
}

impl MonitorRunner {
    pub fn new(
        cycle: MonitoringCycle,
        source: Box<dyn FrameSource>,
        poll_interval: Duration,
        recovery: RecoveryConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            cycle,
            source,
            poll_interval,
            recovery: RecoveryManager::with_config(recovery),
            event_bus,
            stats: MonitorStats::default(),
            pending_stop: None,
        }
    }

    /// Run a single cycle with bookkeeping, returning how long to wait before the next one
    pub async fn run_once(&mut self) -> (MonitoringResult, Duration) {
        let result = self.cycle.run(self.source.as_mut()).await;
        let delay = self.after_cycle(&result);
        (result, delay)
    }

    /// Loop until stopped. Releases the frame source on the way out.
    pub async fn run(&mut self, cancel: CancellationToken) -> StopReason {
        info!(
            "Monitoring {} every {:?} (debounce window {:?})",
            self.source.name(),
            self.poll_interval,
            self.cycle.policy().window()
        );

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if !self.source.is_open() {
                break StopReason::SourceClosed;
            }

            let (_, delay) = self.run_once().await;

            if let Some(reason) = self.pending_stop.take() {
                break reason;
            }
            if !self.source.is_open() {
                break StopReason::SourceClosed;
            }

            debug!("Next cycle in {:?}", delay);
            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        };

        self.finish(reason.clone()).await;
        reason
    }

    fn after_cycle(&mut self, result: &MonitoringResult) -> Duration {
        self.stats.record(result);
        self.event_bus.publish(MonitorEvent::CycleCompleted {
            result: result.clone(),
        });

        if result.acted {
            if let Some(event) = result.event_detected {
                self.event_bus.publish(MonitorEvent::BowlEventFired {
                    event,
                    timestamp: result.timestamp,
                });
            }
        }

        match &result.error {
            Some(CycleError::Capture {
                details,
                recoverable,
            }) => {
                let action = self.recovery.handle_failure(CAPTURE_COMPONENT, details);
                let consecutive = self.consecutive_capture_failures();
                self.event_bus
                    .publish(MonitorEvent::CaptureFailed { consecutive });

                match action {
                    RecoveryAction::RetryAfterDelay(delay) if *recoverable => delay,
                    _ => {
                        self.pending_stop = Some(StopReason::CaptureFailures(consecutive));
                        Duration::ZERO
                    }
                }
            }
            _ => {
                self.recovery.reset_retry_count(CAPTURE_COMPONENT);
                self.poll_interval
            }
        }
    }

    /// Release the source and publish the terminal event
    pub async fn finish(&mut self, reason: StopReason) {
        match &reason {
            StopReason::CaptureFailures(_) => warn!("Monitoring stopped: {}", reason),
            _ => info!("Monitoring stopped: {}", reason),
        }

        self.source.release().await;
        self.cycle.mark_stopped();
        self.event_bus
            .publish(MonitorEvent::MonitorStopped { reason });
    }

    pub fn consecutive_capture_failures(&self) -> u32 {
        self.recovery.get_retry_count(CAPTURE_COMPONENT)
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn phase(&self) -> CyclePhase {
        self.cycle.phase()
    }

    pub fn cycle(&self) -> &MonitoringCycle {
        &self.cycle
    }
}
