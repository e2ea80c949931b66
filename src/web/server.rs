use crate::{
    app::ComponentRegistry,
    config::WebConfig,
    error::{Result, WebError},
    events::{EventBus, MonitorEvent},
    history::EventLog,
};
use axum::{routing::get, Router};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::handlers::{events_handler, health_handler, index_handler};
use super::status::ViewerStatus;

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) event_log: Arc<dyn EventLog>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) status: Arc<RwLock<ViewerStatus>>,
    pub(crate) components: ComponentRegistry,
}

impl ServerState {
    pub fn new(event_log: Arc<dyn EventLog>, event_bus: Arc<EventBus>) -> Self {
        Self {
            event_log,
            event_bus,
            status: Arc::new(RwLock::new(ViewerStatus::default())),
            components: ComponentRegistry::new(),
        }
    }

    pub fn status(&self) -> ViewerStatus {
        self.status.read().clone()
    }
}

/// Read-only HTTP viewer for the event history and monitor status
pub struct ViewerServer {
    pub(crate) config: WebConfig,
    state: ServerState,
    // Subscribed at construction so no monitor event is missed before serving
    receiver: Mutex<Option<broadcast::Receiver<MonitorEvent>>>,
}

impl ViewerServer {
    pub fn new(config: WebConfig, event_log: Arc<dyn EventLog>, event_bus: Arc<EventBus>) -> Self {
        let receiver = event_bus.subscribe();
        Self {
            config,
            state: ServerState::new(event_log, event_bus),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Report the lifecycle states kept in `components` from `/health`
    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.state.components = components;
        self
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Build the router serving the viewer
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/api/events", get(events_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!("{}:{}", self.config.ip, self.config.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| WebError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!("Event viewer listening on http://{}", addr);
        Ok(listener)
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .unwrap_or_else(|| self.state.event_bus.subscribe());
        let tracker = tokio::spawn(track_status(
            self.state.clone(),
            receiver,
            shutdown.clone(),
        ));

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| WebError::Server {
                details: format!("Server error: {}", e),
            });

        tracker.abort();
        info!("Event viewer stopped");
        result?;
        Ok(())
    }
}

/// Keep the viewer status in step with the monitor's events
async fn track_status(
    state: ServerState,
    mut receiver: broadcast::Receiver<MonitorEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = receiver.recv() => match received {
                Ok(event) => {
                    debug!("Viewer status update: {}", event.description());
                    state.status.write().apply(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Viewer status tracker lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
