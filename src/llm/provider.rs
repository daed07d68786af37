use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::DroidClawResult;

/// Unified multimodal model seam. Providers take a rendered prompt plus the
/// screenshots for this round and return the raw response text; all failure
/// modes surface as transient `Model` errors for the loop to retry.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn get_response(&self, prompt: &str, images: &[PathBuf]) -> DroidClawResult<String>;
}
