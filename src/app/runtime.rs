use super::{BowlwatchApp, ComponentState, ShutdownReason};
use crate::error::{BowlwatchError, Result};
use crate::monitor::{MonitorRunner, MonitoringResult, StopReason};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

impl BowlwatchApp {
    /// Run the monitor until a signal arrives or it stops by itself, returning the exit code
    pub async fn run(&mut self) -> Result<i32> {
        info!("Bowlwatch is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| BowlwatchError::system("Shutdown sender already taken"))?;

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| BowlwatchError::system("Shutdown receiver already taken"))?;

        let mut runner = self.take_runner()?;

        self.setup_signal_handlers(shutdown_sender, self.cancellation_token.clone());

        self.components.set("monitor", ComponentState::Running);
        let stop = runner.run(self.cancellation_token.clone()).await;

        // A signal cancels the runner, so prefer its reason when one was sent
        let reason = shutdown_receiver
            .try_recv()
            .unwrap_or(ShutdownReason::MonitorStopped(stop));

        info!("Shutdown initiated: {}", reason);

        let exit_code = self.shutdown(reason).await?;

        info!("Bowlwatch shutdown complete");
        Ok(exit_code)
    }

    /// Run exactly one monitoring cycle and release the frame source
    pub async fn run_once(&mut self) -> Result<MonitoringResult> {
        let mut runner = self.take_runner()?;

        let (result, _) = runner.run_once().await;
        runner.finish(StopReason::Cancelled).await;

        Ok(result)
    }

    fn take_runner(&mut self) -> Result<MonitorRunner> {
        self.runner
            .take()
            .ok_or_else(|| BowlwatchError::system("Monitor has already run"))
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(
        &self,
        shutdown_sender: oneshot::Sender<ShutdownReason>,
        cancel: CancellationToken,
    ) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            let cancel_sigterm = cancel.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if let Some(()) = sigterm.recv().await {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                    cancel_sigterm.cancel();
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
                cancel.cancel();
            }
        });
    }
}
