//! Transformer trait.

use crate::error::Result;
use crate::image::EncodedImage;
use async_trait::async_trait;

/// Sends one photo to an image model and returns the stylized result.
///
/// Implementations make exactly one request per call. They never retry and
/// never cache.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transforms `image` (a data URI or bare base64 payload of type `mime_type`)
    /// and returns the generated image as a data URI.
    async fn transform(&self, image: &EncodedImage, mime_type: &str) -> Result<EncodedImage>;

    /// Returns the name of this transformer for display.
    fn name(&self) -> &str;

    /// Checks if the service is reachable and the credentials are accepted.
    async fn health_check(&self) -> Result<()>;
}
