use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

pub const DISCORD_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

/// Upper bound for `watcher.max_overlapping_cycles`.
pub const MAX_OVERLAPPING_CYCLES: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub watcher: WatcherConfig,
    pub rate_limit: RateLimitConfig,
    pub endpoints: EndpointsConfig,
    pub http: HttpConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie: String,
    pub csrf_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_ms: u64,
    pub failure_backoff_ms: u64,
    pub max_overlapping_cycles: usize,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub catalog_url: String,
    pub economy_url: String,
    pub thumbnails_url: String,
    pub auth_url: String,
    pub users_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_ms: u64,
    pub purchase_timeout_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub queue_capacity: usize,
    pub drain_timeout_ms: u64,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
    pub avatar_url: Option<String>,
    pub mention_role: Option<String>,
    pub mention_user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            csrf_ttl_secs: 600,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            failure_backoff_ms: 1000,
            max_overlapping_cycles: 1,
            verbose: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst: 10,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            catalog_url: "https://www.roblox.com".to_string(),
            economy_url: "https://economy.roblox.com".to_string(),
            thumbnails_url: "https://thumbnails.roblox.com".to_string(),
            auth_url: "https://auth.roblox.com/v2/login".to_string(),
            users_url: "https://users.roblox.com/v1/users/authenticated".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            purchase_timeout_ms: 5000,
            user_agent: "LimitedSniper/0.1".to_string(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            drain_timeout_ms: 3000,
            discord: DiscordConfig::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Limited Sniper".to_string(),
            avatar_url: None,
            mention_role: None,
            mention_user: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    /// Number of cycles one item may have in flight, always in `1..=MAX_OVERLAPPING_CYCLES`.
    pub fn cycle_permits(&self) -> u32 {
        let permits = self.max_overlapping_cycles.clamp(1, MAX_OVERLAPPING_CYCLES);
        u32::try_from(permits).unwrap_or(1)
    }
}

impl NotificationsConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from built-in defaults, then `path` (any format the
    /// `config` crate understands, optional), then `SNIPER__*` environment
    /// variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let s = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SNIPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Accept the bare cookie variable used by most marketplace tooling
        if config.session.cookie.is_empty() {
            if let Ok(cookie) = env::var("ROBLOSECURITY") {
                config.session.cookie = cookie;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.cookie.trim().is_empty() {
            return Err(ConfigError::Message("Session cookie must be set".into()));
        }

        if self.session.csrf_ttl_secs == 0 {
            return Err(ConfigError::Message("CSRF token ttl must be greater than 0".into()));
        }

        if self.watcher.poll_interval_ms == 0 {
            return Err(ConfigError::Message("Watcher poll_interval_ms must be greater than 0".into()));
        }

        if self.watcher.max_overlapping_cycles == 0 {
            return Err(ConfigError::Message(
                "Watcher max_overlapping_cycles must be greater than 0".into(),
            ));
        }

        if self.watcher.max_overlapping_cycles > MAX_OVERLAPPING_CYCLES {
            return Err(ConfigError::Message(format!(
                "Watcher max_overlapping_cycles must be at most {}",
                MAX_OVERLAPPING_CYCLES
            )));
        }

        if self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0 {
            return Err(ConfigError::Message(
                "Rate limit requests_per_second and burst must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("catalog_url", &self.endpoints.catalog_url),
            ("economy_url", &self.endpoints.economy_url),
            ("thumbnails_url", &self.endpoints.thumbnails_url),
            ("auth_url", &self.endpoints.auth_url),
            ("users_url", &self.endpoints.users_url),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigError::Message(format!("Invalid URL for endpoints.{}", name)));
            }
        }

        if self.http.request_timeout_ms == 0 || self.http.purchase_timeout_ms == 0 {
            return Err(ConfigError::Message("HTTP timeouts must be greater than 0".into()));
        }

        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Notification queue_capacity must be greater than 0".into(),
            ));
        }

        if let Some(webhook_url) = &self.notifications.discord.webhook_url {
            if !webhook_url.starts_with(DISCORD_WEBHOOK_PREFIX) {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        Ok(())
    }
}
