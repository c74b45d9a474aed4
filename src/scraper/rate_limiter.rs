//! Per-source request admission
//!
//! Every request a source scraper sends goes through its [`RateLimiter`]. A
//! single worker task drains one FIFO queue, so requests to a source are never
//! in flight concurrently. Before each dispatch the worker enforces the
//! per-minute quota; after each dispatch it sleeps a random delay drawn from
//! the configured range.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::models::{RateLimitConfig, ScrapingMetrics};
use crate::scraper::fetcher::PageFetcher;
use crate::{IngestError, Result};

/// Length of the rolling quota window
const WINDOW: Duration = Duration::from_secs(60);

/// Capacity of the admission queue
const QUEUE_CAPACITY: usize = 64;

/// Locks a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Admission {
    url: String,
    reply: oneshot::Sender<Result<String>>,
}

/// Request counter for the current one-minute window
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
        }
    }

    /// Returns how long to wait before the next request may be dispatched
    fn wait_before_dispatch(&mut self, limit: u32, now: Instant) -> Option<Duration> {
        let elapsed = now.duration_since(self.started);
        if elapsed >= WINDOW {
            *self = Self::new(now);
            return None;
        }
        if self.count >= limit.max(1) {
            return Some(WINDOW - elapsed);
        }
        None
    }
}

/// Serializing, quota-enforcing front end to a [`PageFetcher`]
///
/// Dropping the limiter closes the queue and ends its worker.
pub struct RateLimiter {
    source: String,
    queue: mpsc::Sender<Admission>,
    config: Arc<Mutex<RateLimitConfig>>,
    metrics: Arc<Mutex<ScrapingMetrics>>,
}

impl RateLimiter {
    /// Starts the worker task for one source
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `source` - Source name, used in log fields and errors
    /// * `config` - Initial quota and delay settings
    /// * `fetcher` - Executor that performs the actual requests
    pub fn new(source: &str, config: RateLimitConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let (queue, rx) = mpsc::channel(QUEUE_CAPACITY);
        let config = Arc::new(Mutex::new(config));
        let metrics = Arc::new(Mutex::new(ScrapingMetrics::default()));

        tokio::spawn(run_worker(
            source.to_string(),
            rx,
            fetcher,
            Arc::clone(&config),
            Arc::clone(&metrics),
        ));

        Self {
            source: source.to_string(),
            queue,
            config,
            metrics,
        }
    }

    /// Queues a request and waits for its response body
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(IngestError)` - The executor's error, or `LimiterClosed` if the
    ///   worker is gone
    pub async fn admit(&self, url: &str) -> Result<String> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Admission {
                url: url.to_string(),
                reply,
            })
            .await
            .map_err(|_| IngestError::LimiterClosed(self.source.clone()))?;

        response
            .await
            .map_err(|_| IngestError::LimiterClosed(self.source.clone()))?
    }

    pub fn config(&self) -> RateLimitConfig {
        *lock(&self.config)
    }

    /// Replaces the limits; applies from the next dispatch on
    pub fn set_config(&self, config: RateLimitConfig) {
        *lock(&self.config) = config;
    }

    /// Snapshot of the request counters
    pub fn metrics(&self) -> ScrapingMetrics {
        lock(&self.metrics).clone()
    }
}

async fn run_worker(
    source: String,
    mut rx: mpsc::Receiver<Admission>,
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<Mutex<RateLimitConfig>>,
    metrics: Arc<Mutex<ScrapingMetrics>>,
) {
    let mut window = Window::new(Instant::now());

    while let Some(admission) = rx.recv().await {
        let limits = *lock(&config);

        let now = Instant::now();
        if let Some(wait) = window.wait_before_dispatch(limits.requests_per_minute, now) {
            debug!(
                source = %source,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting for window reset"
            );
            sleep(wait).await;
            window = Window::new(Instant::now());
        }
        window.count += 1;

        let started = Instant::now();
        let result = fetcher.fetch(&admission.url).await;
        let elapsed = started.elapsed();
        lock(&metrics).record(elapsed, result.is_ok());
        trace!(
            source = %source,
            url = %admission.url,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "Request finished"
        );

        // The caller may have given up waiting; the queue keeps going either way
        let _ = admission.reply.send(result);

        sleep(limits.delay_between_requests.sample()).await;
    }

    debug!(source = %source, "Rate limiter worker stopped");
}
