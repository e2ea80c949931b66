use crate::history::EventRecord;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::server::ServerState;
use super::status::ViewerStatus;

const DEFAULT_PAGE_EVENTS: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

async fn load_events(state: &ServerState, limit: usize) -> Result<Vec<EventRecord>, StatusCode> {
    match state.event_log.list().await {
        Ok(mut records) => {
            records.truncate(limit);
            Ok(records)
        }
        Err(e) => {
            error!("Failed to read event history: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handler for the JSON event history, newest first
pub async fn events_handler(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(usize::MAX);
    match load_events(&state, limit).await {
        Ok(records) => (StatusCode::OK, Json(serde_json::json!(records))),
        Err(status) => (
            status,
            Json(serde_json::json!({ "error": "event history unavailable" })),
        ),
    }
}

/// Handler for health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let status = state.status();
    let overall = if !status.is_running() {
        "stopped"
    } else if state.components.any_failed() {
        "degraded"
    } else {
        "healthy"
    };

    let health_info = serde_json::json!({
        "status": overall,
        "monitor": status,
        "components": state.components.snapshot(),
        "server_info": {
            "subscribers": state.event_bus.subscriber_count(),
        }
    });

    (StatusCode::OK, Json(health_info))
}

/// HTML page listing the event history
pub async fn index_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match load_events(&state, DEFAULT_PAGE_EVENTS).await {
        Ok(records) => (StatusCode::OK, Html(render_index(&records, &state.status()))),
        Err(status) => (
            status,
            Html("<h1>Event history unavailable</h1>".to_string()),
        ),
    }
}

pub(crate) fn render_index(records: &[EventRecord], status: &ViewerStatus) -> String {
    let rows = if records.is_empty() {
        r#"<tr><td colspan="2" class="empty">No events recorded yet</td></tr>"#.to_string()
    } else {
        records
            .iter()
            .map(|record| {
                let description = if record.description.is_empty() {
                    record.event.description()
                } else {
                    record.description.as_str()
                };
                format!(
                    r#"<tr class="{}"><td>{}</td><td>{}</td></tr>"#,
                    record.event.event_type(),
                    record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    escape_html(description)
                )
            })
            .collect::<Vec<_>>()
            .join("\n            ")
    };

    let summary = match (&status.stopped, status.last_detected) {
        (Some(reason), _) => format!("Monitor stopped: {}", escape_html(reason)),
        (None, Some(event)) => format!("Last seen: {}", event),
        (None, None) => "Waiting for the first snapshot".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="refresh" content="60">
    <title>Bowlwatch Events</title>
    <style>
        body {{ font-family: sans-serif; margin: 2em; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border: 1px solid #ccc; padding: 0.5em; text-align: left; }}
        tr.bowl_empty td {{ background: #fde2e2; }}
        tr.bowl_refilled td {{ background: #e2f5e2; }}
        tr.partially_eaten td {{ background: #fdf5d8; }}
        .empty {{ color: #888; text-align: center; }}
    </style>
</head>
<body>
    <h1>Pet Food Bowl Events</h1>
    <p>{summary}</p>
    <table>
        <thead><tr><th>Time</th><th>Event</th></tr></thead>
        <tbody>
            {rows}
        </tbody>
    </table>
</body>
</html>"#
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
