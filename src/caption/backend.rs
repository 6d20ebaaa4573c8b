// Remote captioning service seam
// Author: kelexine (https://github.com/kelexine)

use crate::error::Result;
use async_trait::async_trait;

/// The two remote capabilities the orchestrator depends on.
///
/// Implementations must report provider throttling as
/// [`CaptionError::RemoteThrottled`](crate::error::CaptionError::RemoteThrottled)
/// so the retry policy can tell it apart from substantive failures, and any
/// other remote failure as
/// [`CaptionError::NetworkOrServiceError`](crate::error::CaptionError::NetworkOrServiceError).
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    /// Ask the vision model to describe an image. Returns the free-text answer.
    async fn describe_image(&self, image_url: &str, prompt: &str) -> Result<String>;

    /// Ask the vision model for a free-form detailed description.
    async fn describe_in_detail(&self, image_url: &str, prompt: &str) -> Result<String>;

    /// Ask the chat model for captions. Returns the raw JSON text.
    async fn generate_captions(&self, system_prompt: &str, prompt: &str) -> Result<String>;
}
