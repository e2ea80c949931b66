pub mod app;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod frame;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod recovery;
pub mod vision;

#[cfg(feature = "web")]
pub mod web;

pub use app::{BowlwatchApp, ComponentRegistry, ComponentState, ShutdownReason};
pub use camera::{FrameSource, FrameSourceBuilder, MockFrameSource};
pub use classifier::EventClassifier;
pub use config::BowlwatchConfig;
pub use debounce::{DebouncePolicy, DebounceState};
pub use error::{BowlwatchError, Result};
pub use events::{BowlEvent, EventBus, MonitorEvent};
pub use frame::{FrameData, FrameFormat};
pub use history::{EventLog, EventRecord, JsonEventLog, MemoryEventLog};
pub use monitor::{
    CycleError, CyclePhase, MonitorRunner, MonitorStats, MonitoringCycle, MonitoringResult,
    StopReason,
};
pub use notify::{NotificationSink, RecordingNotifier};
pub use recovery::{RecoveryAction, RecoveryConfig, RecoveryManager};
pub use vision::{DescriptionProvider, ScriptedDescriber};

#[cfg(feature = "web")]
pub use web::ViewerServer;
