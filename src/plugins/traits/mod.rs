pub mod notifier;
pub mod price_source;
pub mod purchaser;
pub mod session;
pub mod thumbnail;

pub use notifier::{NotificationMessage, NotificationResult, Notifier};
pub use price_source::PriceSource;
pub use purchaser::{PurchaseExecutor, PurchaseReceipt, PurchaseRequest};
pub use session::{Credentials, SessionProvider};
pub use thumbnail::ThumbnailResolver;
