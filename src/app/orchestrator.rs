use super::state::ComponentRegistry;
use super::types::ShutdownReason;
use crate::camera::{FrameSource, FrameSourceBuilder};
use crate::classifier::EventClassifier;
use crate::config::BowlwatchConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::history::{EventLog, JsonEventLog};
use crate::monitor::{MonitorRunner, MonitoringCycle};
use crate::notify::{build_notifier, NotificationSink};
use crate::recovery::RecoveryConfig;
use crate::vision::{DescriptionProvider, GeminiDescriber};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

const EVENT_BUS_CAPACITY: usize = 64;

/// Wires the configured collaborators into a monitor and runs it alongside the viewer
pub struct BowlwatchApp {
    pub(super) config: BowlwatchConfig,
    pub(super) event_bus: Arc<EventBus>,
    #[cfg(feature = "web")]
    pub(super) event_log: Arc<dyn EventLog>,
    pub(super) runner: Option<MonitorRunner>,
    pub(super) viewer_handle: Option<JoinHandle<Result<()>>>,

    // Lifecycle management
    pub(super) components: ComponentRegistry,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl BowlwatchApp {
    /// Build every collaborator from configuration
    pub async fn new(config: BowlwatchConfig) -> Result<Self> {
        let describer: Arc<dyn DescriptionProvider> = Arc::new(GeminiDescriber::new(&config.vision)?);
        let notifier = build_notifier(&config.notify)?;
        let event_log: Arc<dyn EventLog> = Arc::new(JsonEventLog::new(
            &config.history.path,
            config.history.max_entries,
        ));
        let source = FrameSourceBuilder::new()
            .config(config.camera.clone())
            .build()
            .await?;

        Self::with_components(config, source, describer, notifier, event_log)
    }

    /// Build around caller-supplied collaborators
    pub fn with_components(
        config: BowlwatchConfig,
        source: Box<dyn FrameSource>,
        describer: Arc<dyn DescriptionProvider>,
        notifier: Arc<dyn NotificationSink>,
        event_log: Arc<dyn EventLog>,
    ) -> Result<Self> {
        info!(
            "Using frame source {}, describer {}, notifier {}",
            source.name(),
            describer.name(),
            notifier.name()
        );

        let event_bus = Arc::new(if tracing::enabled!(tracing::Level::TRACE) {
            EventBus::with_debug_logging(EVENT_BUS_CAPACITY)
        } else {
            EventBus::new(EVENT_BUS_CAPACITY)
        });

        let cycle = MonitoringCycle::builder()
            .describer(describer)
            .classifier(EventClassifier::new(&config.classifier))
            .notifier(notifier)
            .event_log(Arc::clone(&event_log))
            .debounce_window(config.monitor.debounce_window())
            .subject_prefix(config.notify.subject_prefix.clone())
            .build()?;

        let runner = MonitorRunner::new(
            cycle,
            source,
            config.monitor.poll_interval(),
            RecoveryConfig::from(&config.monitor),
            Arc::clone(&event_bus),
        );

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            event_bus,
            #[cfg(feature = "web")]
            event_log,
            runner: Some(runner),
            viewer_handle: None,
            components: ComponentRegistry::new(),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &BowlwatchConfig {
        &self.config
    }

    /// Lifecycle states of the monitor and viewer
    pub fn components(&self) -> ComponentRegistry {
        self.components.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Token that stops the monitor and viewer when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
