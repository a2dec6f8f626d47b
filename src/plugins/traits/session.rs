use async_trait::async_trait;
use std::fmt;

use crate::Result;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub cookie: String,
    pub csrf_token: String,
}

// Keep secrets out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .finish()
    }
}

/// Supplies the current session cookie and a valid CSRF token. Refresh
/// policy belongs to the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The session cookie alone. Never touches the network.
    fn cookie(&self) -> String;

    async fn credentials(&self) -> Result<Credentials>;

    /// Drop any cached CSRF token after the server rejected it.
    async fn invalidate(&self);
}
