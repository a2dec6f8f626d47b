use async_trait::async_trait;

use crate::Result;

/// Resolves a preview image for an item. Callers treat failures as "no image".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailResolver: Send + Sync {
    async fn resolve(&self, item_id: &str) -> Result<String>;
}
