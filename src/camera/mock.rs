use super::FrameSource;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::debug;

/// Scripted outcome of one mock read
#[derive(Debug, Clone)]
enum MockRead {
    Frame(FrameData),
    Missing,
    Fail(String),
}

/// Frame source for testing without camera hardware.
///
/// Reads follow the script in order; once it is consumed the source closes.
pub struct MockFrameSource {
    script: VecDeque<MockRead>,
    open: bool,
    reads: u64,
}

impl MockFrameSource {
    /// Create an empty mock source
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            open: true,
            reads: 0,
        }
    }

    /// Source producing `count` small JPEG placeholder frames
    pub fn with_frames(count: usize) -> Self {
        (0..count).fold(Self::new(), |source, _| source.then_frame())
    }

    /// Queue a placeholder JPEG frame
    pub fn then_frame(self) -> Self {
        let id = self.script.len() as u64 + 1;
        self.then(FrameData::new(
            id,
            SystemTime::now(),
            placeholder_jpeg(id),
            640,
            480,
            FrameFormat::Jpeg,
        ))
    }

    /// Queue a specific frame
    pub fn then(mut self, frame: FrameData) -> Self {
        self.script.push_back(MockRead::Frame(frame));
        self
    }

    /// Queue a read that succeeds without a frame
    pub fn then_missing(mut self) -> Self {
        self.script.push_back(MockRead::Missing);
        self
    }

    /// Queue a failing read
    pub fn then_failure<S: Into<String>>(mut self, details: S) -> Self {
        self.script.push_back(MockRead::Fail(details.into()));
        self
    }

    /// Number of reads performed so far
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    fn is_open(&self) -> bool {
        self.open && !self.script.is_empty()
    }

    async fn read(&mut self) -> Result<Option<FrameData>, CameraError> {
        self.reads += 1;

        if !self.open {
            return Err(CameraError::Closed);
        }

        match self.script.pop_front() {
            Some(MockRead::Frame(frame)) => {
                debug!("Mock frame {} read", frame.id);
                Ok(Some(frame))
            }
            Some(MockRead::Missing) | None => Ok(None),
            Some(MockRead::Fail(details)) => Err(CameraError::CaptureStream { details }),
        }
    }

    async fn release(&mut self) {
        self.open = false;
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Minimal JPEG-framed payload; vision doubles never decode it
fn placeholder_jpeg(id: u64) -> Vec<u8> {
    let mut data = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01, 0x00,
        0x48, 0x00, 0x48, 0x00, 0x00,
    ];
    data.extend(vec![(id % 256) as u8; 64]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
