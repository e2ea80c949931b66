mod gemini;
mod mock;
#[cfg(test)]
mod tests;

use crate::error::VisionError;
use crate::frame::FrameData;
use async_trait::async_trait;

pub use gemini::{extract_text, GeminiDescriber};
pub use mock::ScriptedDescriber;

/// External image-understanding service producing a text description of a frame
#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    async fn describe(&self, frame: &FrameData) -> Result<String, VisionError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
