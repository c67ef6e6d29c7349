//! Process-wide task statistics.
//!
//! Every poller records into one [`AggregateStats`]. The outcome counters move
//! together under a single lock, so any snapshot satisfies
//! `processed == succeeded + failed`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Final result of dispatching one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Default)]
struct Counters {
    processed: u64,
    succeeded: u64,
    failed: u64,
    start_time: Option<DateTime<Utc>>,
    last_fetch: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct AggregateStats {
    counters: Mutex<Counters>,
    /// Tasks between fetch and outcome
    in_flight: AtomicU64,
}

/// Point-in-time copy of [`AggregateStats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub in_flight: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub uptime_seconds: f64,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) {
        self.counters.lock().start_time = Some(Utc::now());
    }

    pub fn record_fetch(&self) {
        self.counters.lock().last_fetch = Some(Utc::now());
    }

    pub fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_outcome(&self, outcome: TaskOutcome) {
        {
            let mut counters = self.counters.lock();
            counters.processed += 1;
            match outcome {
                TaskOutcome::Succeeded => counters.succeeded += 1,
                TaskOutcome::Failed => counters.failed += 1,
            }
        }
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters.lock();
        let uptime_seconds = counters
            .start_time
            .map(|start| (Utc::now() - start).num_milliseconds().max(0) as f64 / 1000.0)
            .unwrap_or(0.0);

        StatsSnapshot {
            processed: counters.processed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            in_flight: self.in_flight.load(Ordering::SeqCst),
            start_time: counters.start_time,
            last_fetch: counters.last_fetch,
            uptime_seconds,
        }
    }
}
