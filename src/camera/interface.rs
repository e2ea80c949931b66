//! GStreamer-backed camera. Only built on Linux with the `camera` feature.
#![cfg(all(feature = "camera", target_os = "linux"))]

use super::FrameSource;
use crate::config::{CameraConfig, CameraSource};
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::time::SystemTime;
use tracing::{debug, error, info, trace, warn};

/// Camera frame source pulling single JPEG stills from a GStreamer pipeline.
///
/// The appsink keeps only the newest buffer, so a read after a long poll
/// interval returns a current frame rather than a stale queued one.
pub struct GStreamerCamera {
    config: CameraConfig,
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
    frame_counter: u64,
}

impl GStreamerCamera {
    /// Create the pipeline and start it playing
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        info!(
            "Initializing GStreamer camera ({:?}, device {}, {}x{} @ {}fps)",
            config.source, config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = Self::build_pipeline_string(&config)?;
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no element named 'sink'".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::DeviceOpen {
                device: Self::device_label(&config),
                details: format!("Failed to start pipeline: {}", e),
            })?;

        info!("GStreamer pipeline started successfully");

        Ok(Self {
            config,
            pipeline: Some(pipeline),
            appsink: Some(appsink),
            frame_counter: 0,
        })
    }

    fn device_label(config: &CameraConfig) -> String {
        match config.source {
            CameraSource::Libcamera => "libcamera".to_string(),
            _ => format!("/dev/video{}", config.index),
        }
    }

    /// Build a pipeline ending in an appsink that delivers JPEG stills
    pub(crate) fn build_pipeline_string(config: &CameraConfig) -> Result<String, CameraError> {
        let (width, height) = config.resolution;
        let fps = config.fps;
        let sink = "appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false";

        match config.source {
            CameraSource::V4l2 => Ok(format!(
                "v4l2src device=/dev/video{} io-mode=mmap ! \
                 image/jpeg,width={},height={},framerate={}/1 ! {}",
                config.index, width, height, fps, sink
            )),
            CameraSource::Libcamera => Ok(format!(
                "libcamerasrc ! video/x-raw,width={},height={},framerate={}/1 ! \
                 videoconvert ! jpegenc quality=90 ! {}",
                width, height, fps, sink
            )),
            CameraSource::Directory => Err(CameraError::Configuration {
                details: "Directory sources do not use a GStreamer pipeline".to_string(),
            }),
        }
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<FrameData, CameraError> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| {
                let width = s.get::<i32>("width").ok()?;
                let height = s.get::<i32>("height").ok()?;
                Some((width.max(0) as u32, height.max(0) as u32))
            })
            .unwrap_or(self.config.resolution);

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to map buffer: {}", e),
            })?;

        self.frame_counter += 1;
        let frame = FrameData::new(
            self.frame_counter,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height,
            FrameFormat::Jpeg,
        );

        trace!(
            "Captured JPEG frame {} ({}x{}, {} bytes)",
            frame.id,
            width,
            height,
            map.len()
        );

        Ok(frame)
    }

    /// Get current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }
}

#[async_trait]
impl FrameSource for GStreamerCamera {
    fn is_open(&self) -> bool {
        self.pipeline.is_some()
    }

    async fn read(&mut self) -> Result<Option<FrameData>, CameraError> {
        let appsink = self.appsink.clone().ok_or(CameraError::Closed)?;
        let timeout_ms = self.config.capture_timeout_ms;

        // try_pull_sample blocks, keep it off the runtime threads
        let sample = tokio::task::spawn_blocking(move || {
            appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout_ms))
        })
        .await
        .map_err(|e| CameraError::CaptureStream {
            details: format!("Capture task failed: {}", e),
        })?;

        match sample {
            Some(sample) => self.sample_to_frame(sample).map(Some),
            None => {
                if self.appsink.as_ref().is_some_and(|sink| sink.is_eos()) {
                    warn!("Camera stream reached end of stream");
                    return Err(CameraError::Closed);
                }
                debug!("No sample within {}ms", timeout_ms);
                Err(CameraError::Timeout { timeout_ms })
            }
        }
    }

    async fn release(&mut self) {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            match pipeline.set_state(gstreamer::State::Null) {
                Ok(_) => info!("Camera released"),
                Err(e) => error!("Error releasing camera: {}", e),
            }
        }
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

impl Drop for GStreamerCamera {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
        }
    }
}
