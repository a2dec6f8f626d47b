pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod item_loader;
pub mod models;
pub mod plugins;
pub mod rate_gate;
pub mod registry;
pub mod relay;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherStats};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
