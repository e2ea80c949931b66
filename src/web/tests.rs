use super::handlers::render_index;
use super::*;
use crate::app::{ComponentRegistry, ComponentState};
use crate::config::WebConfig;
use crate::events::{BowlEvent, EventBus, MonitorEvent};
use crate::history::{EventLog, EventRecord, MemoryEventLog};
use crate::monitor::{CycleError, MonitoringResult, StopReason};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn test_config() -> WebConfig {
    WebConfig {
        enabled: true,
        ip: "127.0.0.1".to_string(),
        port: 5001,
    }
}

#[test]
fn test_status_follows_monitor_events() {
    let mut status = ViewerStatus::default();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    status.apply(&MonitorEvent::CycleCompleted {
        result: MonitoringResult {
            event_detected: None,
            frame_captured: false,
            timestamp: now,
            error: Some(CycleError::Capture {
                details: "timeout".to_string(),
                recoverable: true,
            }),
            acted: false,
        },
    });
    status.apply(&MonitorEvent::CaptureFailed { consecutive: 1 });
    assert_eq!(status.cycles, 1);
    assert_eq!(status.last_error.as_deref(), Some("capture failed"));
    assert_eq!(status.consecutive_capture_failures, 1);

    status.apply(&MonitorEvent::CycleCompleted {
        result: MonitoringResult {
            event_detected: Some(BowlEvent::BowlEmpty),
            frame_captured: true,
            timestamp: now,
            error: None,
            acted: true,
        },
    });
    status.apply(&MonitorEvent::BowlEventFired {
        event: BowlEvent::BowlEmpty,
        timestamp: now,
    });
    assert_eq!(status.consecutive_capture_failures, 0);
    assert_eq!(status.last_error, None);
    assert_eq!(status.last_fired, Some(BowlEvent::BowlEmpty));
    assert!(status.is_running());

    status.apply(&MonitorEvent::MonitorStopped {
        reason: StopReason::SourceClosed,
    });
    assert!(!status.is_running());
}

#[test]
fn test_render_index_lists_events() {
    let records = vec![
        EventRecord::new(
            BowlEvent::BowlEmpty,
            Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap(),
        ),
        EventRecord::new(
            BowlEvent::BowlRefilled,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ),
    ];

    let html = render_index(&records, &ViewerStatus::default());

    assert!(html.contains("2024-05-01 18:30:00 UTC"));
    assert!(html.contains("food in the bowl is all gone"));
    assert!(html.contains(r#"<tr class="bowl_refilled">"#));
    assert!(html.find("18:30:00").unwrap() < html.find("08:00:00").unwrap());
    assert!(html.contains("Waiting for the first snapshot"));
}

#[test]
fn test_render_index_empty_history() {
    let status = ViewerStatus {
        stopped: Some("frame source closed".to_string()),
        ..ViewerStatus::default()
    };

    let html = render_index(&[], &status);

    assert!(html.contains("No events recorded yet"));
    assert!(html.contains("Monitor stopped: frame source closed"));
}

#[tokio::test]
async fn test_viewer_serves_history_and_health() {
    let log = MemoryEventLog::new();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    log.append(BowlEvent::BowlRefilled, now).await.unwrap();
    log.append(BowlEvent::BowlEmpty, now + chrono::TimeDelta::hours(2))
        .await
        .unwrap();

    let bus = Arc::new(EventBus::new(16));
    let components = ComponentRegistry::new();
    components.set("monitor", ComponentState::Running);
    components.set("web", ComponentState::Running);
    let server = Arc::new(
        ViewerServer::new(test_config(), Arc::new(log), bus.clone())
            .with_components(components.clone()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let handle = {
        let server = server.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.serve(listener, shutdown).await })
    };

    let client = reqwest::Client::new();

    let events: Vec<EventRecord> = client
        .get(format!("http://{}/api/events", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event, BowlEvent::BowlEmpty);

    let limited: Vec<EventRecord> = client
        .get(format!("http://{}/api/events?limit=1", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    let health: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["monitor"], "running");
    assert_eq!(health["components"]["web"], "running");

    components.set("monitor", ComponentState::Failed);
    let health: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["monitor"], "failed");

    components.set("monitor", ComponentState::Stopped);
    bus.publish(MonitorEvent::MonitorStopped {
        reason: StopReason::Cancelled,
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let health: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "stopped");
    assert_eq!(health["monitor"]["stopped"], "cancelled");
    assert_eq!(health["components"]["monitor"], "stopped");

    let page = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Pet Food Bowl Events"));
    assert!(page.contains("food bowl has been refilled"));

    drop(client);
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_viewer_reports_bind_failure() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let server = ViewerServer::new(
        WebConfig {
            port,
            ..test_config()
        },
        Arc::new(MemoryEventLog::new()),
        Arc::new(EventBus::default()),
    );

    let result = server.start(CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(crate::error::BowlwatchError::Web(
            crate::error::WebError::BindFailed { .. }
        ))
    ));
}
