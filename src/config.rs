use crate::events::BowlEvent;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BowlwatchConfig {
    pub camera: CameraConfig,
    pub vision: VisionConfig,
    pub classifier: ClassifierConfig,
    pub monitor: MonitorConfig,
    pub notify: NotifyConfig,
    pub history: HistoryConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where frames come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    /// USB/V4L2 camera delivering MJPEG
    V4l2,
    /// Raspberry Pi camera module through libcamera
    Libcamera,
    /// Replay of still images from a directory
    Directory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Frame source kind
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Directory of still images when `source = "directory"`
    #[serde(default = "default_camera_directory")]
    pub directory: String,

    /// How long a single read may wait for a frame
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    /// API key for the vision service; falls back to GEMINI_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used to describe frames
    #[serde(default = "default_vision_model")]
    pub model: String,

    /// Base URL of the generative language API
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,

    /// Prompt sent alongside every frame
    #[serde(default = "default_vision_prompt")]
    pub prompt: String,

    /// Request timeout in seconds
    #[serde(default = "default_vision_timeout")]
    pub timeout_seconds: u64,
}

/// One keyword group of the classifier. Groups are tested in order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KeywordRule {
    pub event: BowlEvent,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_rules")]
    pub rules: Vec<KeywordRule>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Minimum time before the same event may notify again
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,

    /// Delay between cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Consecutive capture failures before the loop stops (0 = never)
    #[serde(default = "default_max_capture_failures")]
    pub max_consecutive_capture_failures: u32,

    /// Base delay of the capture retry backoff
    #[serde(default = "default_retry_base_ms")]
    pub capture_retry_base_ms: u64,

    /// Upper bound of the capture retry backoff
    #[serde(default = "default_retry_max_ms")]
    pub capture_retry_max_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    Log,
    Webhook,
    Email,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_kind")]
    pub kind: NotifyKind,

    /// Target of webhook notifications
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Prefix of every notification subject
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Webhook request and SMTP command timeout in seconds
    #[serde(default = "default_notify_timeout")]
    pub timeout_seconds: u64,

    /// SMTP relay, reached with STARTTLS
    #[serde(default)]
    pub smtp_server: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// From address, also the SMTP login
    #[serde(default)]
    pub sender_email: Option<String>,

    #[serde(default)]
    pub sender_password: Option<String>,

    #[serde(default)]
    pub receiver_email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// JSON event log location
    #[serde(default = "default_history_path")]
    pub path: String,

    /// Oldest entries beyond this count are dropped
    #[serde(default = "default_history_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_web_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_web_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub directory: Option<String>,
}

impl MonitorConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl VisionConfig {
    /// Configured key, or the GEMINI_API_KEY environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl BowlwatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("bowlwatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.source", "v4l2")?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.directory", default_camera_directory())?
            .set_default("camera.capture_timeout_ms", default_capture_timeout_ms())?
            .set_default("vision.model", default_vision_model())?
            .set_default("vision.endpoint", default_vision_endpoint())?
            .set_default("vision.prompt", default_vision_prompt())?
            .set_default("vision.timeout_seconds", default_vision_timeout())?
            .set_default("monitor.debounce_seconds", default_debounce_seconds())?
            .set_default("monitor.poll_interval_seconds", default_poll_interval())?
            .set_default(
                "monitor.max_consecutive_capture_failures",
                default_max_capture_failures(),
            )?
            .set_default("monitor.capture_retry_base_ms", default_retry_base_ms())?
            .set_default("monitor.capture_retry_max_ms", default_retry_max_ms())?
            .set_default("notify.kind", "log")?
            .set_default("notify.subject_prefix", default_subject_prefix())?
            .set_default("notify.timeout_seconds", default_notify_timeout())?
            .set_default("notify.smtp_port", default_smtp_port())?
            .set_default("history.path", default_history_path())?
            .set_default(
                "history.max_entries",
                default_history_max_entries() as i64,
            )?
            .set_default("web.enabled", default_web_enabled())?
            .set_default("web.ip", default_web_ip())?
            .set_default("web.port", default_web_port())?
            // Keyword rules come from serde defaults unless the file overrides them
            .set_default("classifier.rules", Vec::<String>::new())?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(
                Environment::with_prefix("BOWLWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: BowlwatchConfig = settings.try_deserialize()?;

        if config.classifier.rules.is_empty() {
            config.classifier.rules = default_classifier_rules();
        }

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config.redacted());

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.source == CameraSource::Directory && self.camera.directory.is_empty() {
            return Err(ConfigError::Message(
                "Camera directory must be set for the directory source".to_string(),
            ));
        }

        if self.monitor.poll_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Monitor poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.capture_retry_base_ms > self.monitor.capture_retry_max_ms {
            return Err(ConfigError::Message(
                "Monitor capture_retry_base_ms must not exceed capture_retry_max_ms".to_string(),
            ));
        }

        if self.classifier.rules.is_empty() {
            return Err(ConfigError::Message(
                "Classifier needs at least one keyword rule".to_string(),
            ));
        }

        for rule in &self.classifier.rules {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::Message(format!(
                    "Classifier rule for {} has no keywords",
                    rule.event.event_type()
                )));
            }
        }

        if self.notify.kind == NotifyKind::Webhook
            && self.notify.webhook_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::Message(
                "notify.webhook_url is required for webhook notifications".to_string(),
            ));
        }

        if self.notify.kind == NotifyKind::Email {
            let missing = [
                ("smtp_server", &self.notify.smtp_server),
                ("sender_email", &self.notify.sender_email),
                ("receiver_email", &self.notify.receiver_email),
            ]
            .into_iter()
            .find(|(_, value)| value.as_deref().unwrap_or("").trim().is_empty());

            if let Some((field, _)) = missing {
                return Err(ConfigError::Message(format!(
                    "notify.{} is required for email notifications",
                    field
                )));
            }
            if self.notify.smtp_port == 0 {
                return Err(ConfigError::Message(
                    "notify.smtp_port must be greater than 0".to_string(),
                ));
            }
        }

        if self.history.max_entries == 0 {
            return Err(ConfigError::Message(
                "History max_entries must be greater than 0".to_string(),
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(ConfigError::Message(
                "Web port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy safe to log (secrets blanked)
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.vision.api_key.is_some() {
            copy.vision.api_key = Some("***".to_string());
        }
        if copy.notify.sender_password.is_some() {
            copy.notify.sender_password = Some("***".to_string());
        }
        copy
    }
}

impl Default for BowlwatchConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: default_camera_source(),
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                directory: default_camera_directory(),
                capture_timeout_ms: default_capture_timeout_ms(),
            },
            vision: VisionConfig {
                api_key: None,
                model: default_vision_model(),
                endpoint: default_vision_endpoint(),
                prompt: default_vision_prompt(),
                timeout_seconds: default_vision_timeout(),
            },
            classifier: ClassifierConfig::default(),
            monitor: MonitorConfig {
                debounce_seconds: default_debounce_seconds(),
                poll_interval_seconds: default_poll_interval(),
                max_consecutive_capture_failures: default_max_capture_failures(),
                capture_retry_base_ms: default_retry_base_ms(),
                capture_retry_max_ms: default_retry_max_ms(),
            },
            notify: NotifyConfig {
                kind: default_notify_kind(),
                webhook_url: None,
                subject_prefix: default_subject_prefix(),
                timeout_seconds: default_notify_timeout(),
                smtp_server: None,
                smtp_port: default_smtp_port(),
                sender_email: None,
                sender_password: None,
                receiver_email: None,
            },
            history: HistoryConfig {
                path: default_history_path(),
                max_entries: default_history_max_entries(),
            },
            web: WebConfig {
                enabled: default_web_enabled(),
                ip: default_web_ip(),
                port: default_web_port(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_classifier_rules(),
        }
    }
}

// Default value functions
fn default_camera_source() -> CameraSource {
    CameraSource::V4l2
}
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    5
}
fn default_camera_directory() -> String {
    "./frames".to_string()
}
fn default_capture_timeout_ms() -> u64 {
    5000
}

fn default_vision_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_vision_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_vision_prompt() -> String {
    "Describe the state of the stainless steel pet food bowl in the image. \
     Is it full, empty, or partially eaten?"
        .to_string()
}
fn default_vision_timeout() -> u64 {
    30
}

pub(crate) fn default_classifier_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule {
            event: BowlEvent::BowlEmpty,
            keywords: vec!["empty".to_string(), "all gone".to_string()],
        },
        KeywordRule {
            event: BowlEvent::BowlRefilled,
            keywords: vec!["full".to_string(), "refilled".to_string()],
        },
        KeywordRule {
            event: BowlEvent::PartiallyEaten,
            keywords: vec!["partially".to_string(), "some food".to_string()],
        },
    ]
}

fn default_debounce_seconds() -> u64 {
    3600
}
fn default_poll_interval() -> u64 {
    300
}
fn default_max_capture_failures() -> u32 {
    5
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_retry_max_ms() -> u64 {
    60_000
}

fn default_notify_kind() -> NotifyKind {
    NotifyKind::Log
}
fn default_subject_prefix() -> String {
    "Pet Food Alert".to_string()
}
fn default_notify_timeout() -> u64 {
    10
}
fn default_smtp_port() -> u16 {
    587
}

fn default_history_path() -> String {
    "event_log.json".to_string()
}
fn default_history_max_entries() -> usize {
    1000
}

fn default_web_enabled() -> bool {
    true
}
fn default_web_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_web_port() -> u16 {
    5001
}
