use crate::error::CameraError;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};
#[cfg(feature = "frame_encoding")]
use image::codecs::jpeg::JpegEncoder;

/// Frame format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// JPEG compressed still (MJPEG cameras deliver these)
    Jpeg,
    /// PNG compressed still
    Png,
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Jpeg | FrameFormat::Png => 0, // Variable size, compressed
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        !matches!(self, FrameFormat::Rgb24)
    }

    /// MIME type understood by the vision service
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            FrameFormat::Jpeg => Some("image/jpeg"),
            FrameFormat::Png => Some("image/png"),
            FrameFormat::Rgb24 => None,
        }
    }

    /// Guess the format of an image file from its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(FrameFormat::Jpeg),
            "png" => Some(FrameFormat::Png),
            _ => None,
        }
    }

    /// File extension used when writing a frame to disk
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "jpg",
            FrameFormat::Png => "png",
            FrameFormat::Rgb24 => "rgb",
        }
    }
}

/// A single still frame. The cycle treats it as opaque and hands it to the
/// description provider unchanged.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels (0 when unknown)
    pub width: u32,
    /// Frame height in pixels (0 when unknown)
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => !self.data.is_empty(),
        }
    }
}

/// Bytes ready to be sent to a vision service
#[derive(Debug, Clone)]
pub struct UploadImage {
    pub data: Arc<Vec<u8>>,
    pub mime_type: &'static str,
}

/// Frame processing utilities
pub struct FrameProcessor;

impl FrameProcessor {
    /// Produce a compressed image the vision service accepts.
    /// Compressed frames pass through; raw RGB frames are JPEG-encoded.
    pub fn encode_for_upload(frame: &FrameData) -> Result<UploadImage, CameraError> {
        if let Some(mime_type) = frame.format.mime_type() {
            return Ok(UploadImage {
                data: Arc::clone(&frame.data),
                mime_type,
            });
        }

        let jpeg = Self::encode_jpeg(frame)?;
        Ok(UploadImage {
            data: jpeg,
            mime_type: "image/jpeg",
        })
    }

    /// Encode a raw RGB24 frame to JPEG
    #[cfg(feature = "frame_encoding")]
    pub fn encode_jpeg(frame: &FrameData) -> Result<Arc<Vec<u8>>, CameraError> {
        match frame.format {
            FrameFormat::Jpeg => Ok(Arc::clone(&frame.data)),
            FrameFormat::Png => Err(CameraError::UnsupportedFormat {
                details: "PNG frames are uploaded as-is".to_string(),
            }),
            FrameFormat::Rgb24 => {
                if !frame.validate_size() {
                    return Err(CameraError::UnsupportedFormat {
                        details: format!(
                            "RGB24 frame {} has {} bytes, expected {}x{}x3",
                            frame.id,
                            frame.data.len(),
                            frame.width,
                            frame.height
                        ),
                    });
                }

                let mut buf = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
                encoder
                    .encode(
                        &frame.data,
                        frame.width,
                        frame.height,
                        image::ColorType::Rgb8,
                    )
                    .map_err(|e| CameraError::UnsupportedFormat {
                        details: format!("JPEG encoding failed: {}", e),
                    })?;

                tracing::debug!(
                    "Encoded RGB24 frame {} ({}x{}) to {} JPEG bytes",
                    frame.id,
                    frame.width,
                    frame.height,
                    buf.len()
                );
                Ok(Arc::new(buf))
            }
        }
    }

    #[cfg(not(feature = "frame_encoding"))]
    pub fn encode_jpeg(frame: &FrameData) -> Result<Arc<Vec<u8>>, CameraError> {
        match frame.format {
            FrameFormat::Jpeg => Ok(Arc::clone(&frame.data)),
            other => Err(CameraError::UnsupportedFormat {
                details: format!(
                    "{:?} frame {} needs the frame_encoding feature",
                    other, frame.id
                ),
            }),
        }
    }
}
