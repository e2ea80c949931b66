use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

/// Recovery action to take after a failure
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Retry after a delay
    RetryAfterDelay(Duration),
    /// Give up and stop
    Shutdown,
}

/// Retry strategy configuration
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of consecutive failures before giving up, 0 for unlimited
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub exponential_backoff: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_backoff: true,
        }
    }
}

impl From<&crate::config::MonitorConfig> for RecoveryConfig {
    fn from(config: &crate::config::MonitorConfig) -> Self {
        Self {
            max_retries: config.max_consecutive_capture_failures,
            base_delay: Duration::from_millis(config.capture_retry_base_ms),
            max_delay: Duration::from_millis(config.capture_retry_max_ms),
            exponential_backoff: true,
        }
    }
}

/// Tracks consecutive failures per component and decides when to back off or give up
pub struct RecoveryManager {
    config: RecoveryConfig,
    retry_counts: HashMap<String, u32>,
}

impl RecoveryManager {
    /// Create a new recovery manager with default configuration
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    /// Create a new recovery manager with custom configuration
    pub fn with_config(config: RecoveryConfig) -> Self {
        Self {
            config,
            retry_counts: HashMap::new(),
        }
    }

    /// Record a failure of `component` and decide what to do next
    pub fn handle_failure(&mut self, component: &str, details: &str) -> RecoveryAction {
        let retry_count = self.get_retry_count(component).saturating_add(1);
        self.retry_counts.insert(component.to_string(), retry_count);

        if self.config.max_retries > 0 && retry_count >= self.config.max_retries {
            error!(
                "Maximum consecutive failures ({}) reached for {}: {}",
                self.config.max_retries, component, details
            );
            return RecoveryAction::Shutdown;
        }

        let delay = self.calculate_delay(retry_count - 1);

        if self.config.max_retries > 0 {
            info!(
                "Retrying {} in {:?} (failure {}/{}): {}",
                component, delay, retry_count, self.config.max_retries, details
            );
        } else {
            info!(
                "Retrying {} in {:?} (failure {}): {}",
                component, delay, retry_count, details
            );
        }

        RecoveryAction::RetryAfterDelay(delay)
    }

    /// Reset retry count for a component after a success
    pub fn reset_retry_count(&mut self, component: &str) {
        if self.retry_counts.remove(component).is_some() {
            info!("Component {} recovered, reset retry count", component);
        }
    }

    /// Calculate delay for retry with exponential backoff
    pub fn calculate_delay(&self, retry_count: u32) -> Duration {
        if !self.config.exponential_backoff {
            return self.config.base_delay.min(self.config.max_delay);
        }

        let base_ms = self.config.base_delay.as_millis() as u64;
        let delay_ms = 2_u64
            .checked_pow(retry_count)
            .and_then(|factor| base_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);

        Duration::from_millis(delay_ms).min(self.config.max_delay)
    }

    /// Get current retry count for a component
    pub fn get_retry_count(&self, component: &str) -> u32 {
        self.retry_counts.get(component).copied().unwrap_or(0)
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_retries: u32) -> RecoveryConfig {
        RecoveryConfig {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            exponential_backoff: true,
        }
    }

    #[test]
    fn test_recovery_manager_retry_logic() {
        let mut manager = RecoveryManager::with_config(config(3));

        let action = manager.handle_failure("camera", "timeout");
        assert_eq!(
            action,
            RecoveryAction::RetryAfterDelay(Duration::from_millis(100))
        );
        assert_eq!(manager.get_retry_count("camera"), 1);

        let action = manager.handle_failure("camera", "timeout");
        assert_eq!(
            action,
            RecoveryAction::RetryAfterDelay(Duration::from_millis(200))
        );

        let final_action = manager.handle_failure("camera", "timeout");
        assert_eq!(final_action, RecoveryAction::Shutdown);
    }

    #[test]
    fn test_single_failure_limit_stops_immediately() {
        let mut manager = RecoveryManager::with_config(config(1));
        assert_eq!(
            manager.handle_failure("camera", "closed"),
            RecoveryAction::Shutdown
        );
    }

    #[test]
    fn test_unlimited_retries_cap_delay() {
        let mut manager = RecoveryManager::with_config(config(0));

        let mut last = RecoveryAction::Shutdown;
        for _ in 0..100 {
            last = manager.handle_failure("camera", "timeout");
        }

        assert_eq!(
            last,
            RecoveryAction::RetryAfterDelay(Duration::from_millis(1000))
        );
        assert_eq!(manager.get_retry_count("camera"), 100);
    }

    #[test]
    fn test_unlimited_retry_count_saturates() {
        let mut manager = RecoveryManager::with_config(config(0));
        manager.retry_counts.insert("camera".to_string(), u32::MAX);

        assert_eq!(
            manager.handle_failure("camera", "timeout"),
            RecoveryAction::RetryAfterDelay(Duration::from_millis(1000))
        );
        assert_eq!(manager.get_retry_count("camera"), u32::MAX);
    }

    #[test]
    fn test_reset_retry_count() {
        let mut manager = RecoveryManager::with_config(config(3));
        manager.handle_failure("camera", "timeout");
        manager.handle_failure("camera", "timeout");
        manager.reset_retry_count("camera");

        assert_eq!(manager.get_retry_count("camera"), 0);
        assert_eq!(
            manager.handle_failure("camera", "timeout"),
            RecoveryAction::RetryAfterDelay(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_fixed_delay_without_backoff() {
        let manager = RecoveryManager::with_config(RecoveryConfig {
            exponential_backoff: false,
            ..config(3)
        });
        assert_eq!(manager.calculate_delay(5), Duration::from_millis(100));
    }
}
