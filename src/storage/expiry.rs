//! Active Expiry
//!
//! Reads never see an expired key and writes purge the key they touch, but a
//! key nobody touches again would sit in memory indefinitely. [`ExpirySweeper`]
//! is a Tokio task that periodically calls [`StorageEngine::cleanup_expired`]
//! to reclaim those.
//!
//! The pause between sweeps adapts to the workload: it halves while a large
//! share of keys is expiring and doubles while nothing is, staying within
//! `[min-interval-ms, max-interval-ms]`.
//!
//! Sweepers are configured from the `expiry` block of the settings file:
//!
//! ```yaml
//! expiry:
//!   enabled: true
//!   base-interval-ms: 100
//!   min-interval-ms: 10
//!   max-interval-ms: 1000
//!   speedup-threshold: 0.25
//!   slowdown-threshold: 0.01
//! ```

use crate::storage::StorageEngine;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Sweeper settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExpiryConfig {
    /// Whether in-memory stores run a sweeper at all
    pub enabled: bool,

    /// Starting pause between sweeps
    pub base_interval_ms: u64,

    /// Shortest pause the sweeper speeds up to
    pub min_interval_ms: u64,

    /// Longest pause the sweeper backs off to
    pub max_interval_ms: u64,

    /// Expired share of keys above which the sweeper speeds up
    pub speedup_threshold: f64,

    /// Expired share of keys below which an idle sweeper backs off
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval_ms: 100,
            min_interval_ms: 10,
            max_interval_ms: 1_000,
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

impl ExpiryConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    /// Same settings, starting from a different base interval.
    pub fn with_base_interval(&self, base: Duration) -> Self {
        Self {
            base_interval_ms: base.as_millis() as u64,
            ..self.clone()
        }
    }
}

/// Tracks the current pause and adapts it after each sweep.
#[derive(Debug, Clone)]
struct Pacer {
    current: Duration,
    min: Duration,
    max: Duration,
    speedup_threshold: f64,
    slowdown_threshold: f64,
}

impl Pacer {
    fn new(config: &ExpiryConfig) -> Self {
        let (min, max) = (config.min_interval(), config.max_interval().max(config.min_interval()));
        Self {
            current: config.base_interval().clamp(min, max),
            min,
            max,
            speedup_threshold: config.speedup_threshold,
            slowdown_threshold: config.slowdown_threshold,
        }
    }

    /// Records a sweep that removed `expired` of `seen` keys and returns the next pause.
    fn record(&mut self, expired: u64, seen: u64) -> Duration {
        if seen == 0 {
            return self.current;
        }

        let rate = expired as f64 / seen as f64;
        if rate > self.speedup_threshold {
            self.current = (self.current / 2).max(self.min);
            debug!(
                expired,
                rate = %format!("{:.2}%", rate * 100.0),
                next_ms = self.current.as_millis(),
                "Many keys expiring, sweeping sooner"
            );
        } else if expired == 0 && rate < self.slowdown_threshold {
            self.current = (self.current * 2).min(self.max);
            trace!(next_ms = self.current.as_millis(), "Nothing expired, backing off");
        }
        self.current
    }
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
    sweeps: Arc<AtomicU64>,
}

impl ExpirySweeper {
    /// Spawns a sweeper for `engine` on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use rediskit::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(Arc::clone(&engine), ExpiryConfig::default());
    /// assert!(sweeper.is_running());
    ///
    /// sweeper.stop();
    /// assert!(!sweeper.is_running());
    /// # }
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeps = Arc::new(AtomicU64::new(0));

        tokio::spawn(run(engine, Pacer::new(&config), Arc::clone(&sweeps), shutdown_rx));
        info!(base_interval_ms = config.base_interval_ms, "Expiry sweeper started");

        Self {
            shutdown_tx,
            sweeps,
        }
    }

    /// Number of sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow()
    }

    /// Stops the sweeper. Also called on drop; later calls do nothing.
    ///
    /// The stopped state is recorded even when the task is already gone,
    /// for example after its runtime shut down.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!(sweeps = self.sweeps(), "Expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    engine: Arc<StorageEngine>,
    mut pacer: Pacer,
    sweeps: Arc<AtomicU64>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut pause = pacer.current;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper shutting down");
                    return;
                }
            }
        }

        let live = engine.len() as u64;
        let expired = engine.cleanup_expired();
        sweeps.fetch_add(1, Ordering::Relaxed);

        // `live` excludes the expired keys, so together they are everything the sweep saw
        pause = pacer.record(expired, live + expired);
    }
}

/// Starts a sweeper with [`ExpiryConfig::default`].
pub fn start_expiry_sweeper(engine: Arc<StorageEngine>) -> ExpirySweeper {
    ExpirySweeper::start(engine, ExpiryConfig::default())
}
