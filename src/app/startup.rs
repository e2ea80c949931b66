use super::BowlwatchApp;
use crate::error::Result;
use tracing::info;

impl BowlwatchApp {
    /// Register components before starting them
    pub async fn initialize(&mut self) -> Result<()> {
        self.components.register("monitor");
        if self.viewer_enabled() {
            self.components.register("web");
        }

        info!("Components initialized");
        Ok(())
    }

    /// Start background components. The monitor itself starts in `run`.
    pub async fn start(&mut self) -> Result<()> {
        #[cfg(feature = "web")]
        if self.viewer_enabled() {
            self.start_viewer().await?;
        }

        Ok(())
    }

    pub(super) fn viewer_enabled(&self) -> bool {
        cfg!(feature = "web") && self.config.web.enabled
    }

    #[cfg(feature = "web")]
    async fn start_viewer(&mut self) -> Result<()> {
        use super::ComponentState;
        use crate::web::ViewerServer;
        use std::sync::Arc;
        use tracing::error;

        self.components.set("web", ComponentState::Starting);

        let server = ViewerServer::new(
            self.config.web.clone(),
            Arc::clone(&self.event_log),
            Arc::clone(&self.event_bus),
        )
        .with_components(self.components.clone());

        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to start event viewer: {}", e);
                self.components.set("web", ComponentState::Failed);
                return Err(e);
            }
        };

        let token = self.cancellation_token.child_token();
        self.viewer_handle = Some(tokio::spawn(async move {
            server.serve(listener, token).await
        }));

        self.components.set("web", ComponentState::Running);
        info!("Event viewer started");
        Ok(())
    }
}
