use super::{DirectoryFrameSource, FrameSource};
use crate::config::{CameraConfig, CameraSource};
use crate::error::{BowlwatchError, Result};

/// Builder for the configured frame source
pub struct FrameSourceBuilder {
    config: Option<CameraConfig>,
}

impl FrameSourceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<Box<dyn FrameSource>> {
        let config = self
            .config
            .ok_or_else(|| BowlwatchError::system("Camera configuration must be specified"))?;

        match config.source {
            CameraSource::Directory => {
                let source = DirectoryFrameSource::open(&config.directory).await?;
                Ok(Box::new(source))
            }
            CameraSource::V4l2 | CameraSource::Libcamera => Self::build_camera(config),
        }
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn build_camera(config: CameraConfig) -> Result<Box<dyn FrameSource>> {
        let camera = super::GStreamerCamera::new(config)?;
        Ok(Box::new(camera))
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    fn build_camera(config: CameraConfig) -> Result<Box<dyn FrameSource>> {
        Err(crate::error::CameraError::Configuration {
            details: format!(
                "{:?} cameras need the camera feature on Linux; use source = \"directory\"",
                config.source
            ),
        }
        .into())
    }
}

impl Default for FrameSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
