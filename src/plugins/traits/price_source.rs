use async_trait::async_trait;

use crate::models::SampleResult;
use crate::Result;

/// Live price lookup for a single item. Sampling only needs the session
/// cookie, never a CSRF token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn sample(&self, item_id: &str, cookie: &str) -> Result<SampleResult>;
}
