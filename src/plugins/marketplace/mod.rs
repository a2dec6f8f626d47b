//! HTTP adapters for the marketplace web APIs.

pub mod catalog;
pub mod economy;
pub mod session;
pub mod thumbnails;

pub use catalog::CatalogPageSource;
pub use economy::EconomyPurchaser;
pub use session::{AuthenticatedUser, CsrfSession};
pub use thumbnails::BatchThumbnailResolver;

pub const SESSION_COOKIE_NAME: &str = ".ROBLOSECURITY";
pub const CSRF_HEADER: &str = "x-csrf-token";

pub(crate) fn cookie_header(cookie: &str) -> String {
    format!("{}={}", SESSION_COOKIE_NAME, cookie)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
