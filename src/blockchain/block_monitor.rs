use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info, warn};
use rand::Rng;
use tokio::time::sleep;

use crate::blockchain::{BlockSource, OutflowDetector};
use crate::error::{MonitorError, ProviderError};
use crate::models::{signature_prefix, BlockFetch, TxRecord};
use crate::notify::{NotificationSink, OutflowAlert};
use crate::watermark::WatermarkStore;

/// Timing and concurrency knobs for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Lower bound of the randomized idle sleep in milliseconds.
    pub poll_min_ms: u64,
    /// Upper bound of the randomized idle sleep in milliseconds.
    pub poll_max_ms: u64,
    /// How many block fetches are in flight at once while filling a gap.
    pub fetch_concurrency: usize,
    /// Extended sleep after a transient provider failure in milliseconds.
    pub failure_backoff_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_min_ms: 400,
            poll_max_ms: 800,
            fetch_concurrency: 16,
            failure_backoff_ms: 5000,
        }
    }
}

/// Outcome of one outer loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUp {
    /// No new slots since the watermark.
    Idle,
    /// The whole pending gap was drained; watermark is at the polled height.
    Advanced(u64),
    /// A transient fetch failure stopped the drain; watermark is at the last
    /// good slot and the rest of the gap is retried next iteration.
    Stalled(u64),
}

/// The block-monitoring engine.
///
/// Owns the in-memory watermark exclusively: the store is read once at
/// startup and written after every advance, never re-read. Fetching is
/// concurrent per batch, but draining is strictly sequential in ascending
/// slot order, so alerts always leave in ledger order and the watermark
/// never moves past a slot that was not fully processed or confirmed absent.
pub struct BlockMonitor<S: BlockSource> {
    source: S,
    sink: Arc<dyn NotificationSink>,
    detector: OutflowDetector,
    store: WatermarkStore,
    pub config: MonitorConfig,
    shutdown_signal: Arc<AtomicBool>,
    watermark: u64,
}

impl<S: BlockSource> BlockMonitor<S> {
    pub fn new(
        source: S,
        sink: Arc<dyn NotificationSink>,
        detector: OutflowDetector,
        store: WatermarkStore,
        config: Option<MonitorConfig>,
    ) -> Self {
        Self {
            source,
            sink,
            detector,
            store,
            config: config.unwrap_or_default(),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            watermark: 0,
        }
    }

    /// Highest slot fully processed or confirmed absent.
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Flag shared with the signal handler task.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_signal.load(Ordering::Relaxed)
    }

    /// Seed the in-memory watermark: resume from the persisted value, or
    /// start just below the current height so monitoring begins with the
    /// next new slot rather than the entire chain history.
    pub async fn init(&mut self) -> Result<u64, ProviderError> {
        if let Some(persisted) = self.store.load() {
            info!("resuming from persisted watermark, slot {}", persisted);
            self.watermark = persisted;
        } else {
            let height = self.source.current_height().await?;
            self.watermark = height.saturating_sub(1);
            info!(
                "no persisted watermark, starting at current height {}",
                height
            );
            self.persist();
        }
        Ok(self.watermark)
    }

    /// One outer iteration: poll the height and drain the pending gap.
    pub async fn catch_up(&mut self) -> Result<CatchUp, ProviderError> {
        let target = self.source.current_height().await?;
        if target <= self.watermark {
            return Ok(CatchUp::Idle);
        }

        // Every slot in (watermark, target] must be visited exactly once;
        // intermediate slots are never revisited otherwise.
        let pending: Vec<u64> = (self.watermark + 1..=target).collect();
        debug!(
            "filling gap of {} slots ({}..={})",
            pending.len(),
            self.watermark + 1,
            target
        );

        for batch in pending.chunks(self.config.fetch_concurrency.max(1)) {
            if self.shutdown_requested() {
                info!("shutdown requested, stopping after committed slot {}", self.watermark);
                return Ok(CatchUp::Stalled(self.watermark));
            }

            let fetches = join_all(batch.iter().map(|&slot| self.source.fetch_block(slot))).await;

            let batch_start = self.watermark;
            let mut stalled = false;
            for (&slot, result) in batch.iter().zip(fetches) {
                match result {
                    Ok(BlockFetch::Absent) => {
                        debug!("slot {} permanently absent", slot);
                        self.watermark = slot;
                    }
                    Ok(BlockFetch::Present(transactions)) => {
                        self.process_block(slot, &transactions);
                        self.watermark = slot;
                    }
                    Err(e) => {
                        warn!("transient failure fetching slot {}: {}", slot, e);
                        self.source.report_failure();
                        stalled = true;
                        break;
                    }
                }
            }

            if self.watermark > batch_start {
                self.persist();
            }
            if stalled {
                return Ok(CatchUp::Stalled(self.watermark));
            }
        }

        // A clean full drain is the caller-side signal that the active
        // endpoint is healthy again.
        self.source.report_recovery();
        Ok(CatchUp::Advanced(self.watermark))
    }

    /// Decode/match one block's transactions strictly in listing order.
    fn process_block(&self, slot: u64, transactions: &[TxRecord]) {
        for tx in transactions {
            for (wallet, event) in self.detector.matching_outflows(tx) {
                info!(
                    "matched outflow at slot {}: {} moved {} SOL, sig {}",
                    slot,
                    wallet.label,
                    event.amount_sol,
                    signature_prefix(&event.signature)
                );
                self.sink.dispatch(OutflowAlert {
                    label: wallet.label.clone(),
                    amount_sol: event.amount_sol,
                    receiver: event.receiver,
                    signature: event.signature,
                    slot,
                });
            }
        }
    }

    /// Persist the watermark. A failed save is logged and absorbed: the
    /// in-memory watermark still advances, and duplicate reprocessing after
    /// a crash is the accepted fallback.
    fn persist(&self) {
        if let Err(e) = self.store.save(self.watermark) {
            error!("failed to persist watermark {}: {}", self.watermark, e);
        }
    }

    /// Run until a shutdown signal. Provider errors are never fatal here;
    /// they trigger failover and backoff, then the loop retries.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        info!(
            "starting block monitor: poll {}..{} ms, fetch concurrency {}",
            self.config.poll_min_ms, self.config.poll_max_ms, self.config.fetch_concurrency
        );

        loop {
            if self.shutdown_requested() {
                return Ok(());
            }
            match self.init().await {
                Ok(watermark) => {
                    info!("monitoring begins after slot {}", watermark);
                    break;
                }
                Err(e) => {
                    warn!("startup height poll failed: {}", e);
                    self.source.report_failure();
                    self.backoff_sleep().await;
                }
            }
        }

        loop {
            if self.shutdown_requested() {
                info!("shutdown signal received, stopping block monitor");
                return Ok(());
            }

            match self.catch_up().await {
                Ok(CatchUp::Idle) => self.poll_sleep().await,
                Ok(CatchUp::Advanced(watermark)) => {
                    debug!("gap drained, watermark at slot {}", watermark);
                    self.poll_sleep().await;
                }
                Ok(CatchUp::Stalled(_)) => {
                    if !self.shutdown_requested() {
                        self.backoff_sleep().await;
                    }
                }
                Err(e) => {
                    warn!("height poll failed: {}", e);
                    self.source.report_failure();
                    self.backoff_sleep().await;
                }
            }
        }
    }

    /// Randomized idle sleep; the jitter avoids thundering-herd
    /// synchronization with the provider across restarts or instances.
    async fn poll_sleep(&self) {
        let delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.config.poll_min_ms..=self.config.poll_max_ms.max(self.config.poll_min_ms))
        };
        sleep(Duration::from_millis(delay)).await;
    }

    async fn backoff_sleep(&self) {
        sleep(Duration::from_millis(self.config.failure_backoff_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_min_ms, 400);
        assert_eq!(config.poll_max_ms, 800);
        assert_eq!(config.fetch_concurrency, 16);
        assert_eq!(config.failure_backoff_ms, 5000);
    }

    #[test]
    fn test_catch_up_outcome_equality() {
        assert_eq!(CatchUp::Advanced(10), CatchUp::Advanced(10));
        assert_ne!(CatchUp::Advanced(10), CatchUp::Stalled(10));
        assert_ne!(CatchUp::Idle, CatchUp::Stalled(0));
    }
}
