//! Topic Poller
//!
//! One long-running loop per topic: fetch and lock, dispatch each task in
//! order, then wait. Consecutive fetch errors back off linearly up to a cap;
//! at the configured threshold the poller gives up on its topic alone.
//! Every wait, including the fetch itself, yields to the cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::{BackoffPolicy, PollerState};
use super::dispatcher::TaskDispatcher;
use super::stats::AggregateStats;
use crate::camunda::EngineClient;
use crate::config::BridgeConfig;

/// Why a poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    Cancelled,
    TooManyErrors { consecutive_errors: u32 },
}

/// Wait timings for a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerTimings {
    pub idle_sleep: Duration,
    pub busy_interval: Duration,
    pub backoff: BackoffPolicy,
}

impl PollerTimings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            idle_sleep: config.camunda.idle_sleep(),
            busy_interval: config.worker.busy_poll_interval(),
            backoff: BackoffPolicy::from_config(&config.worker),
        }
    }
}

#[derive(Debug)]
pub struct TopicPoller {
    topic: String,
    engine: Arc<dyn EngineClient>,
    dispatcher: TaskDispatcher,
    stats: Arc<AggregateStats>,
    timings: PollerTimings,
    cancel: CancellationToken,
}

impl TopicPoller {
    pub fn new(
        topic: impl Into<String>,
        engine: Arc<dyn EngineClient>,
        dispatcher: TaskDispatcher,
        stats: Arc<AggregateStats>,
        timings: PollerTimings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            topic: topic.into(),
            engine,
            dispatcher,
            stats,
            timings,
            cancel,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn run(self) -> PollerExit {
        info!(topic = %self.topic, "Topic poller started");
        let mut state = PollerState::new();

        let exit = loop {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollerExit::Cancelled,
                result = self.engine.fetch_and_lock(&self.topic) => result,
            };

            match fetched {
                Ok(tasks) => {
                    state.record_success();
                    self.stats.record_fetch();

                    if tasks.is_empty() {
                        debug!(topic = %self.topic, "No tasks available");
                        if !self.wait(self.timings.idle_sleep).await {
                            break PollerExit::Cancelled;
                        }
                        continue;
                    }

                    info!(topic = %self.topic, count = tasks.len(), "Fetched tasks");

                    for (index, task) in tasks.iter().enumerate() {
                        if self.cancel.is_cancelled() {
                            info!(
                                topic = %self.topic,
                                remaining = tasks.len() - index,
                                "Stop requested; remaining tasks stay locked at the engine"
                            );
                            break;
                        }
                        self.dispatcher.dispatch(task, &self.topic).await;
                    }

                    if !self.wait(self.timings.busy_interval).await {
                        break PollerExit::Cancelled;
                    }
                }
                Err(e) => {
                    let consecutive_errors = state.record_error();
                    error!(
                        topic = %self.topic,
                        consecutive_errors = consecutive_errors,
                        "Fetch and lock failed: {}", e
                    );

                    if state.should_give_up(&self.timings.backoff) {
                        error!(
                            topic = %self.topic,
                            consecutive_errors = consecutive_errors,
                            "Too many consecutive errors; stopping poller for this topic"
                        );
                        break PollerExit::TooManyErrors { consecutive_errors };
                    }

                    let delay = state.next_delay(&self.timings.backoff);
                    warn!(
                        topic = %self.topic,
                        consecutive_errors = consecutive_errors,
                        delay_secs = delay.as_secs(),
                        "Backing off after fetch error"
                    );
                    if !self.wait(delay).await {
                        break PollerExit::Cancelled;
                    }
                }
            }
        };

        info!(topic = %self.topic, exit = ?exit, "Topic poller finished");
        exit
    }

    /// Sleep unless cancelled first; `false` means stop
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
