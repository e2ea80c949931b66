use super::{BowlwatchApp, ComponentState, ShutdownReason};
use crate::error::{BowlwatchError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const COMPONENT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl BowlwatchApp {
    /// Stop the remaining components and work out the exit code
    pub async fn shutdown(&mut self, reason: ShutdownReason) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();
        self.components.set("monitor", ComponentState::Stopped);

        let mut exit_code = reason.exit_code();

        if let Err(e) = self.stop_viewer().await {
            error!("Error stopping web viewer: {}", e);
            exit_code = exit_code.max(1);
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_viewer(&mut self) -> Result<()> {
        let Some(handle) = self.viewer_handle.take() else {
            return Ok(());
        };

        info!("Stopping web component");
        self.components.set("web", ComponentState::Stopping);

        let outcome = match timeout(COMPONENT_STOP_TIMEOUT, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(BowlwatchError::component(
                "web",
                format!("viewer task failed: {}", e),
            )),
            Err(_) => Err(BowlwatchError::component("web", "stop timeout")),
        };

        let state = if outcome.is_ok() {
            ComponentState::Stopped
        } else {
            ComponentState::Failed
        };
        self.components.set("web", state);

        outcome
    }
}
