use super::FrameSource;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};

/// Replays still images from a directory in lexical file-name order.
///
/// Each read returns the next image; once every file has been read the source
/// reports itself closed, which ends the monitoring loop.
pub struct DirectoryFrameSource {
    directory: PathBuf,
    pending: VecDeque<PathBuf>,
    frame_counter: u64,
    open: bool,
}

impl DirectoryFrameSource {
    /// Scan the directory for `.jpg`, `.jpeg` and `.png` files
    pub async fn open<P: AsRef<Path>>(directory: P) -> Result<Self, CameraError> {
        let directory = directory.as_ref().to_path_buf();
        debug!("Scanning for frames in: {}", directory.display());

        let mut entries = fs::read_dir(&directory)
            .await
            .map_err(|e| CameraError::DeviceOpen {
                device: directory.display().to_string(),
                details: e.to_string(),
            })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && FrameFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            warn!("No image files found in {}", directory.display());
        } else {
            info!(
                "Replaying {} frames from {}",
                files.len(),
                directory.display()
            );
        }

        Ok(Self {
            directory,
            pending: files.into(),
            frame_counter: 0,
            open: true,
        })
    }

    /// Number of frames not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Read a single image file as a frame
    pub async fn load_file(path: &Path, id: u64) -> Result<FrameData, CameraError> {
        let format = FrameFormat::from_path(path).ok_or_else(|| CameraError::UnsupportedFormat {
            details: format!("{} is not a JPEG or PNG file", path.display()),
        })?;

        let data = fs::read(path).await?;
        let timestamp = fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());

        Ok(FrameData::new(id, timestamp, data, 0, 0, format))
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    fn is_open(&self) -> bool {
        self.open && !self.pending.is_empty()
    }

    async fn read(&mut self) -> Result<Option<FrameData>, CameraError> {
        if !self.open {
            return Err(CameraError::Closed);
        }

        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        self.frame_counter += 1;
        let frame = Self::load_file(&path, self.frame_counter).await?;
        debug!(
            "Read frame {} from {} ({} bytes)",
            frame.id,
            path.display(),
            frame.data.len()
        );

        if frame.data.is_empty() {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    async fn release(&mut self) {
        self.open = false;
        self.pending.clear();
        debug!("Released directory source {}", self.directory.display());
    }

    fn name(&self) -> &str {
        "directory"
    }
}
