//! Monitor loop: periodic statistics and broker reconnection.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::stats::AggregateStats;
use crate::messaging::{MessagingResult, QueuePublisher};

#[derive(Debug)]
pub struct Monitor {
    publisher: Arc<dyn QueuePublisher>,
    stats: Arc<AggregateStats>,
    running: Arc<AtomicBool>,
    interval: Duration,
    error_retry: Duration,
    cancel: CancellationToken,
}

impl Monitor {
    pub fn new(
        publisher: Arc<dyn QueuePublisher>,
        stats: Arc<AggregateStats>,
        running: Arc<AtomicBool>,
        interval: Duration,
        error_retry: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            publisher,
            stats,
            running,
            interval,
            error_retry,
            cancel,
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Monitor started");

        loop {
            let wait = match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(())) => self.interval,
                Ok(Err(e)) => {
                    error!("Monitor iteration failed: {}", e);
                    self.error_retry
                }
                Err(_) => {
                    error!("Monitor iteration panicked");
                    self.error_retry
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Monitor finished");
    }

    /// One iteration; a failed reconnect is reported so the next try comes sooner
    pub async fn tick(&self) -> MessagingResult<()> {
        if self.running.load(Ordering::SeqCst) {
            let snapshot = self.stats.snapshot();
            info!(
                uptime_secs = snapshot.uptime_seconds as u64,
                processed = snapshot.processed,
                succeeded = snapshot.succeeded,
                failed = snapshot.failed,
                in_flight = snapshot.in_flight,
                "Monitor"
            );
        }

        if !self.publisher.is_connected() {
            warn!("Broker connection lost, attempting to reconnect");
            self.publisher.reconnect().await?;
            info!("Broker connection restored");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryQueuePublisher;

    fn monitor(publisher: Arc<InMemoryQueuePublisher>, cancel: CancellationToken) -> Monitor {
        Monitor::new(
            publisher,
            Arc::new(AggregateStats::new()),
            Arc::new(AtomicBool::new(true)),
            Duration::from_secs(30),
            Duration::from_secs(10),
            cancel,
        )
    }

    #[tokio::test]
    async fn test_tick_reconnects_when_disconnected() {
        let publisher = Arc::new(InMemoryQueuePublisher::default());
        let monitor = monitor(publisher.clone(), CancellationToken::new());

        monitor.tick().await.unwrap();

        assert_eq!(publisher.reconnect_attempts(), 1);
        assert!(publisher.is_connected());
    }

    #[tokio::test]
    async fn test_tick_skips_reconnect_when_healthy() {
        let publisher = Arc::new(InMemoryQueuePublisher::default());
        publisher.connect().await.unwrap();
        let monitor = monitor(publisher.clone(), CancellationToken::new());

        monitor.tick().await.unwrap();
        assert_eq!(publisher.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reconnect_retries_on_short_interval() {
        let publisher = Arc::new(InMemoryQueuePublisher::default());
        publisher.set_fail_reconnect(true);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor(publisher.clone(), cancel.clone()).run());

        // Attempts at t=0, 10, 20; the healthy 30s interval would give only one
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(publisher.reconnect_attempts(), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let publisher = Arc::new(InMemoryQueuePublisher::default());
        publisher.connect().await.unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor(publisher, cancel.clone()).run());

        tokio::task::yield_now().await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop promptly")
            .unwrap();
    }
}
