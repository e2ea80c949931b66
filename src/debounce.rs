use crate::events::BowlEvent;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Last event that caused an action and when it happened.
///
/// Owned by exactly one monitoring cycle; each monitored bowl needs its own
/// instance. Not persisted, so a restart starts from the empty state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub last_event: Option<BowlEvent>,
    pub last_event_time: DateTime<Utc>,
}

impl DebounceState {
    /// Record an action taken for `event` at `timestamp`
    pub fn record(&mut self, event: BowlEvent, timestamp: DateTime<Utc>) {
        self.last_event = Some(event);
        // Keep the time non-decreasing even if the wall clock steps back
        if timestamp > self.last_event_time {
            self.last_event_time = timestamp;
        }
    }
}

/// Decides whether a detected event warrants a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    window: Duration,
}

impl DebouncePolicy {
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// A changed event fires immediately. The same event fires again only once
    /// strictly more than the window has elapsed since it last fired.
    pub fn should_act(
        &self,
        event: Option<BowlEvent>,
        now: DateTime<Utc>,
        state: &DebounceState,
    ) -> bool {
        let Some(event) = event else {
            return false;
        };

        if state.last_event != Some(event) {
            return true;
        }

        let window = TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(state.last_event_time) > window
    }
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
