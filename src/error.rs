use thiserror::Error;

#[derive(Error, Debug)]
pub enum BowlwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Web error: {0}")]
    Web(#[from] WebError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl BowlwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera configuration invalid: {details}")]
    Configuration { details: String },

    #[error("Failed to open camera device {device}: {details}")]
    DeviceOpen { device: String, details: String },

    #[error("Frame capture failed: {details}")]
    CaptureStream { details: String },

    #[error("No frame received within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Frame source is closed")]
    Closed,

    #[error("Unsupported frame format: {details}")]
    UnsupportedFormat { details: String },

    #[error("Frame source IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Whether a later read can reasonably succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CameraError::CaptureStream { .. } | CameraError::Timeout { .. } | CameraError::Io(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Vision API key is not configured (set vision.api_key or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Vision request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Vision service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Vision service returned no description")]
    EmptyResponse,

    #[error("Frame could not be prepared for upload: {details}")]
    Encoding { details: String },

    #[error("Vision provider failure: {details}")]
    Provider { details: String },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification endpoint returned {status}")]
    Status { status: u16 },

    #[error("Notification delivery failed: {details}")]
    Delivery { details: String },

    #[error("Invalid email address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Event log IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Event log encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Event log write failed: {details}")]
    Write { details: String },
}

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind web viewer to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Web viewer failed: {details}")]
    Server { details: String },
}

pub type Result<T> = std::result::Result<T, BowlwatchError>;
