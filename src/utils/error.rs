use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Plugin error: {plugin_type}: {message}")]
    Plugin { plugin_type: String, message: String },

    #[error("Session error: {0}")]
    Session(String),

    // First sample of an item failed; its watcher stops for good.
    #[error("Could not resolve identity of item {item_id}: {reason}")]
    IdentityResolution { item_id: String, reason: String },

    #[error("Sampling item {item_id} failed: {reason}")]
    TransientSample { item_id: String, reason: String },

    #[error("Purchase of item {item_id} rejected: {reason}")]
    PurchaseRejected { item_id: String, reason: String },

    #[error("Purchase transport error: {0}")]
    PurchaseTransport(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse {
            message: message.into(),
        }
    }

    pub fn plugin(plugin_type: &str, message: impl Into<String>) -> Self {
        AppError::Plugin {
            plugin_type: plugin_type.to_string(),
            message: message.into(),
        }
    }
}

// Implement conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
