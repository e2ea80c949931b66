use super::DescriptionProvider;
use crate::error::VisionError;
use crate::frame::FrameData;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Description provider returning canned responses in order.
///
/// Clones share the same script, so a test can keep a handle after moving a
/// clone into the cycle.
#[derive(Clone, Default)]
pub struct ScriptedDescriber {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<u64>>,
}

impl ScriptedDescriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describer answering with each description in turn
    pub fn with_descriptions<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let describer = Self::new();
        for description in descriptions {
            describer.push_description(description);
        }
        describer
    }

    pub fn push_description<S: Into<String>>(&self, description: S) {
        self.responses.lock().push_back(Ok(description.into()));
    }

    pub fn push_failure<S: Into<String>>(&self, details: S) {
        self.responses.lock().push_back(Err(details.into()));
    }

    /// Number of describe calls so far
    pub fn calls(&self) -> u64 {
        *self.calls.lock()
    }
}

#[async_trait]
impl DescriptionProvider for ScriptedDescriber {
    async fn describe(&self, _frame: &FrameData) -> Result<String, VisionError> {
        *self.calls.lock() += 1;

        match self.responses.lock().pop_front() {
            Some(Ok(description)) => Ok(description),
            Some(Err(details)) => Err(VisionError::Provider { details }),
            None => Err(VisionError::Provider {
                details: "no scripted response left".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
