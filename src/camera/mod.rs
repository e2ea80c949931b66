mod builder;
mod directory;
mod interface;
mod mock;
#[cfg(test)]
mod tests;

use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;

pub use builder::FrameSourceBuilder;
pub use directory::DirectoryFrameSource;
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use interface::GStreamerCamera;
pub use mock::MockFrameSource;

/// Source of still frames consumed by the monitoring cycle.
///
/// `read` returning `Err` means the capture was not ok; `Ok(None)` means the
/// source produced no frame. The cycle treats both as a capture failure.
#[async_trait]
pub trait FrameSource: Send {
    /// Whether the source can still produce frames
    fn is_open(&self) -> bool;

    /// Capture one frame
    async fn read(&mut self) -> Result<Option<FrameData>, CameraError>;

    /// Release the underlying device; later reads fail
    async fn release(&mut self);

    /// Short name used in logs
    fn name(&self) -> &str;
}
