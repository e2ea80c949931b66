use super::*;
use crate::camera::MockFrameSource;
use crate::debounce::DebouncePolicy;
use crate::events::{BowlEvent, EventBus, MonitorEvent};
use crate::history::{EventLog, MemoryEventLog};
use crate::notify::RecordingNotifier;
use crate::recovery::RecoveryConfig;
use crate::vision::ScriptedDescriber;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

struct Harness {
    describer: ScriptedDescriber,
    notifier: RecordingNotifier,
    log: MemoryEventLog,
}

impl Harness {
    fn new<I: IntoIterator<Item = &'static str>>(descriptions: I) -> Self {
        Self {
            describer: ScriptedDescriber::with_descriptions(descriptions),
            notifier: RecordingNotifier::new(),
            log: MemoryEventLog::new(),
        }
    }

    fn cycle(&self, window: Duration) -> MonitoringCycle {
        MonitoringCycle::builder()
            .describer(Arc::new(self.describer.clone()))
            .notifier(Arc::new(self.notifier.clone()))
            .event_log(Arc::new(self.log.clone()))
            .debounce_window(window)
            .build()
            .unwrap()
    }
}

fn recovery(max_retries: u32) -> RecoveryConfig {
    RecoveryConfig {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        exponential_backoff: true,
    }
}

#[tokio::test]
async fn test_three_distinct_events_all_fire() {
    let harness = Harness::new([
        "The stainless steel bowl is full of kibble, nicely refilled.",
        "The bowl is partially eaten, some kibble remains.",
        "The bowl is empty.",
    ]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(3);

    let expected = [
        BowlEvent::BowlRefilled,
        BowlEvent::PartiallyEaten,
        BowlEvent::BowlEmpty,
    ];
    for (i, event) in expected.iter().enumerate() {
        let result = cycle.run_at(&mut source, at(i as i64 * 60)).await;
        assert!(result.is_ok());
        assert!(result.frame_captured);
        assert!(result.acted);
        assert_eq!(result.event_detected, Some(*event));
    }

    assert_eq!(harness.notifier.count(), 3);
    assert_eq!(harness.log.len(), 3);
    assert_eq!(cycle.state().last_event, Some(BowlEvent::BowlEmpty));
    assert_eq!(cycle.state().last_event_time, at(120));
    assert_eq!(cycle.phase(), CyclePhase::Idle);

    let notifications = harness.notifier.notifications();
    assert_eq!(
        notifications[2].subject,
        "Pet Food Alert: food in the bowl is all gone"
    );
    assert_eq!(
        notifications[2].body,
        "An event has been detected: food in the bowl is all gone"
    );
}

#[tokio::test]
async fn test_capture_failure_skips_everything_else() {
    let harness = Harness::new(["The bowl is empty."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::new().then_failure("device unplugged");

    let result = cycle.run_at(&mut source, at(0)).await;

    assert!(!result.frame_captured);
    assert_eq!(result.event_detected, None);
    assert!(!result.acted);
    assert!(matches!(result.error, Some(CycleError::Capture { .. })));
    assert_eq!(result.error.unwrap().to_string(), "capture failed");
    assert_eq!(harness.describer.calls(), 0);
    assert_eq!(harness.notifier.count(), 0);
    assert!(harness.log.is_empty());
}

#[tokio::test]
async fn test_missing_frame_is_a_capture_failure() {
    let harness = Harness::new(["The bowl is empty."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::new().then_missing();

    let result = cycle.run_at(&mut source, at(0)).await;

    assert!(!result.frame_captured);
    assert!(matches!(result.error, Some(CycleError::Capture { .. })));
    assert_eq!(harness.describer.calls(), 0);
}

#[tokio::test]
async fn test_description_failure_is_classification_error() {
    let harness = Harness::new([]);
    harness.describer.push_failure("quota exceeded");
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(1);

    let result = cycle.run_at(&mut source, at(0)).await;

    assert!(result.frame_captured);
    assert_eq!(result.event_detected, None);
    let message = result.error.unwrap().to_string();
    assert!(message.starts_with("classification failed: "));
    assert!(message.contains("quota exceeded"));
    assert_eq!(harness.notifier.count(), 0);
    assert!(harness.log.is_empty());
    assert_eq!(cycle.state().last_event, None);
}

#[tokio::test]
async fn test_unrecognized_description_does_nothing() {
    let harness = Harness::new(["I can see a cat sitting on a mat."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(1);

    let result = cycle.run_at(&mut source, at(0)).await;

    assert!(result.is_ok());
    assert!(result.frame_captured);
    assert_eq!(result.event_detected, None);
    assert!(!result.acted);
    assert_eq!(harness.notifier.count(), 0);
}

#[tokio::test]
async fn test_repeated_event_is_debounced() {
    let harness = Harness::new(["The bowl is empty.", "Still empty.", "Empty again."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(3);

    let first = cycle.run_at(&mut source, at(0)).await;
    assert!(first.acted);

    // Detected but suppressed
    let second = cycle.run_at(&mut source, at(3600)).await;
    assert!(second.is_ok());
    assert_eq!(second.event_detected, Some(BowlEvent::BowlEmpty));
    assert!(!second.acted);

    let third = cycle.run_at(&mut source, at(3601)).await;
    assert!(third.acted);

    assert_eq!(harness.notifier.count(), 2);
    assert_eq!(cycle.state().last_event_time, at(3601));
}

#[tokio::test]
async fn test_changed_event_overrides_window() {
    let harness = Harness::new(["The bowl is empty.", "The bowl is full."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(2);

    cycle.run_at(&mut source, at(0)).await;
    let result = cycle.run_at(&mut source, at(1)).await;

    assert!(result.acted);
    assert_eq!(harness.notifier.count(), 2);
    assert_eq!(cycle.state().last_event, Some(BowlEvent::BowlRefilled));
}

#[tokio::test]
async fn test_notification_failure_leaves_state_for_retry() {
    let harness = Harness::new(["The bowl is empty.", "The bowl is empty."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(2);

    harness.notifier.set_failing(true);
    let failed = cycle.run_at(&mut source, at(0)).await;

    assert!(failed.frame_captured);
    assert_eq!(failed.event_detected, Some(BowlEvent::BowlEmpty));
    assert!(!failed.acted);
    assert!(failed
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .starts_with("action failed: "));
    assert_eq!(cycle.state().last_event, None);
    assert!(harness.log.is_empty());

    harness.notifier.set_failing(false);
    let retried = cycle.run_at(&mut source, at(60)).await;

    assert!(retried.acted);
    assert_eq!(harness.notifier.count(), 1);
    assert_eq!(harness.log.len(), 1);
    assert_eq!(cycle.state().last_event, Some(BowlEvent::BowlEmpty));
}

#[tokio::test]
async fn test_log_failure_is_action_error() {
    let harness = Harness::new(["The bowl is empty."]);
    let mut cycle = harness.cycle(Duration::from_secs(3600));
    let mut source = MockFrameSource::with_frames(1);

    harness.log.set_failing(true);
    let result = cycle.run_at(&mut source, at(0)).await;

    assert!(matches!(result.error, Some(CycleError::Action(_))));
    assert_eq!(cycle.state().last_event, None);
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    assert!(MonitoringCycle::builder().build().is_err());

    let cycle = MonitoringCycle::builder()
        .describer(Arc::new(ScriptedDescriber::new()))
        .notifier(Arc::new(RecordingNotifier::new()))
        .event_log(Arc::new(MemoryEventLog::new()))
        .build()
        .unwrap();
    assert_eq!(cycle.policy().window(), DebouncePolicy::DEFAULT_WINDOW);
    assert_eq!(cycle.phase(), CyclePhase::Idle);
}

#[tokio::test]
async fn test_runner_stops_when_source_closes() {
    let harness = Harness::new(["The bowl is empty.", "The bowl is full."]);
    let bus = Arc::new(EventBus::new(32));
    let mut events = bus.subscribe();

    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(MockFrameSource::with_frames(2)),
        Duration::from_millis(1),
        recovery(5),
        bus.clone(),
    );

    let reason = runner.run(CancellationToken::new()).await;

    assert_eq!(reason, StopReason::SourceClosed);
    assert_eq!(runner.phase(), CyclePhase::Stopped);
    assert_eq!(runner.stats().cycles, 2);
    assert_eq!(runner.stats().actions_fired, 2);
    assert_eq!(runner.stats().last_event, Some(BowlEvent::BowlRefilled));

    let mut fired = 0;
    let mut stopped = None;
    while let Ok(event) = events.try_recv() {
        match event {
            MonitorEvent::BowlEventFired { .. } => fired += 1,
            MonitorEvent::MonitorStopped { reason } => stopped = Some(reason),
            _ => {}
        }
    }
    assert_eq!(fired, 2);
    assert_eq!(stopped, Some(StopReason::SourceClosed));
    assert_eq!(harness.log.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_runner_stops_after_consecutive_capture_failures() {
    let harness = Harness::new([]);
    let source = MockFrameSource::new()
        .then_failure("timeout")
        .then_missing()
        .then_failure("timeout")
        .then_frame();

    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(source),
        Duration::from_millis(1),
        recovery(3),
        Arc::new(EventBus::default()),
    );

    let reason = runner.run(CancellationToken::new()).await;

    assert_eq!(reason, StopReason::CaptureFailures(3));
    assert_eq!(runner.stats().capture_failures, 3);
    assert_eq!(harness.describer.calls(), 0);
}

#[tokio::test]
async fn test_runner_single_failure_limit_stops_immediately() {
    let harness = Harness::new([]);
    let source = MockFrameSource::new().then_failure("closed").then_frame();

    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(source),
        Duration::from_millis(1),
        recovery(1),
        Arc::new(EventBus::default()),
    );

    assert_eq!(
        runner.run(CancellationToken::new()).await,
        StopReason::CaptureFailures(1)
    );
    assert_eq!(runner.stats().cycles, 1);
}

#[tokio::test]
async fn test_runner_capture_success_resets_failure_count() {
    let harness = Harness::new(["nothing to see", "nothing to see"]);
    let source = MockFrameSource::new()
        .then_failure("timeout")
        .then_frame()
        .then_failure("timeout")
        .then_frame();

    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(source),
        Duration::from_millis(1),
        recovery(2),
        Arc::new(EventBus::default()),
    );

    assert_eq!(
        runner.run(CancellationToken::new()).await,
        StopReason::SourceClosed
    );
    assert_eq!(runner.stats().capture_failures, 2);
    assert_eq!(runner.stats().frames_captured, 2);
    assert_eq!(runner.consecutive_capture_failures(), 0);
}

#[tokio::test]
async fn test_runner_honours_cancellation() {
    let harness = Harness::new(["The bowl is empty."]);
    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(MockFrameSource::with_frames(5)),
        Duration::from_secs(3600),
        recovery(5),
        Arc::new(EventBus::default()),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let reason = tokio::time::timeout(Duration::from_secs(5), runner.run(cancel))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Cancelled);
    assert_eq!(runner.stats().cycles, 1);
    assert_eq!(harness.notifier.count(), 1);
}

#[tokio::test]
async fn test_runner_does_not_start_when_already_cancelled() {
    let harness = Harness::new(["The bowl is empty."]);
    let mut runner = MonitorRunner::new(
        harness.cycle(Duration::from_secs(3600)),
        Box::new(MockFrameSource::with_frames(1)),
        Duration::from_millis(1),
        recovery(5),
        Arc::new(EventBus::default()),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(runner.run(cancel).await, StopReason::Cancelled);
    assert_eq!(runner.stats().cycles, 0);
    assert_eq!(harness.describer.calls(), 0);
}
