// Integration tests for Limited Sniper
// In-memory collaborators plus helpers shared by the test modules

pub mod adapters_tests;
pub mod coordinator_tests;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use limited_sniper::models::SampleResult;
use limited_sniper::plugins::traits::{
    Credentials, NotificationMessage, NotificationResult, Notifier, PriceSource, PurchaseExecutor,
    PurchaseReceipt, PurchaseRequest, SessionProvider, ThumbnailResolver,
};
use limited_sniper::plugins::Collaborators;
use limited_sniper::{AppConfig, AppError};

pub const PRODUCT_ID: i64 = 11;
pub const SELLER_ID: i64 = 22;
pub const USER_ASSET_ID: i64 = 33;

/// Test configuration: fast polling, generous rate limit, no failure backoff.
pub fn get_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.cookie = "test-cookie".to_string();
    config.watcher.poll_interval_ms = 100;
    config.watcher.failure_backoff_ms = 0;
    config.watcher.max_overlapping_cycles = 1;
    config.watcher.verbose = true;
    config.rate_limit.requests_per_second = 1000;
    config.rate_limit.burst = 1000;
    config.notifications.queue_capacity = 16;
    config.notifications.drain_timeout_ms = 1000;
    config
}

pub fn sample(price: i64) -> SampleResult {
    SampleResult::new(price, PRODUCT_ID, SELLER_ID, USER_ASSET_ID)
}

/// Replays a list of prices; `None` is a failed sample. The last entry
/// repeats once the script runs out.
pub struct ScriptedPriceSource {
    script: Vec<Option<i64>>,
    calls: AtomicUsize,
}

impl ScriptedPriceSource {
    pub fn new(script: Vec<Option<i64>>) -> Arc<Self> {
        assert!(!script.is_empty());
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn constant(price: i64) -> Arc<Self> {
        Self::new(vec![Some(price)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn sample(&self, item_id: &str, _cookie: &str) -> limited_sniper::Result<SampleResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script[call.min(self.script.len() - 1)];
        match step {
            Some(price) => Ok(sample(price)),
            None => Err(AppError::plugin("scripted", format!("no listing for {}", item_id))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PurchaseMode {
    Succeed,
    Reject(&'static str),
    Fail(&'static str),
}

/// Purchase executor that follows a list of modes and keeps track of
/// how many calls overlap.
pub struct CountingPurchaser {
    modes: Vec<PurchaseMode>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<(Instant, PurchaseRequest)>>,
}

impl CountingPurchaser {
    pub fn new(modes: Vec<PurchaseMode>) -> Arc<Self> {
        Self::with_delay(modes, Duration::ZERO)
    }

    pub fn with_delay(modes: Vec<PurchaseMode>, delay: Duration) -> Arc<Self> {
        assert!(!modes.is_empty());
        Arc::new(Self {
            modes,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Instant, PurchaseRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PurchaseExecutor for CountingPurchaser {
    async fn execute(
        &self,
        request: &PurchaseRequest,
        _credentials: &Credentials,
    ) -> limited_sniper::Result<PurchaseReceipt> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.requests.lock().unwrap().push((Instant::now(), request.clone()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let latency = Duration::from_millis(25);
        match &self.modes[call.min(self.modes.len() - 1)] {
            PurchaseMode::Succeed => Ok(PurchaseReceipt {
                purchased: true,
                price: request.price,
                latency,
                reason: String::new(),
            }),
            PurchaseMode::Reject(reason) => Ok(PurchaseReceipt {
                purchased: false,
                price: request.price,
                latency,
                reason: reason.to_string(),
            }),
            PurchaseMode::Fail(detail) => Err(AppError::PurchaseTransport(detail.to_string())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<NotificationMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, message: &NotificationMessage) -> limited_sniper::Result<NotificationResult> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(NotificationResult {
            success: true,
            message_id: None,
            error: None,
        })
    }
}

pub struct StaticSession;

#[async_trait]
impl SessionProvider for StaticSession {
    fn cookie(&self) -> String {
        "test-cookie".to_string()
    }

    async fn credentials(&self) -> limited_sniper::Result<Credentials> {
        Ok(Credentials {
            cookie: self.cookie(),
            csrf_token: "test-token".to_string(),
        })
    }

    async fn invalidate(&self) {}
}

pub struct NoThumbnails;

#[async_trait]
impl ThumbnailResolver for NoThumbnails {
    async fn resolve(&self, item_id: &str) -> limited_sniper::Result<String> {
        Err(AppError::NotFound {
            resource: format!("thumbnail for {}", item_id),
        })
    }
}

pub fn collaborators(
    price_source: Arc<ScriptedPriceSource>,
    purchaser: Arc<CountingPurchaser>,
    notifier: Arc<RecordingNotifier>,
) -> Collaborators {
    Collaborators {
        price_source,
        purchaser,
        session: Arc::new(StaticSession),
        thumbnails: Arc::new(NoThumbnails),
        notifier,
    }
}

/// Cancel `token` after `after` has elapsed.
pub fn cancel_after(token: &tokio_util::sync::CancellationToken, after: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        token.cancel();
    });
}

/// Wait for a condition to be true with timeout
pub async fn wait_for_condition<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
