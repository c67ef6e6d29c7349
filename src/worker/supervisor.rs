//! # Worker Supervisor
//!
//! Owns the topic pollers and the monitor for the life of the process.
//!
//! ```text
//! initialize()  connect broker, declare topology
//! start()       spawn one poller per routed topic + monitor, wait for stop
//! shutdown()    cancel, join each task under a timeout, disconnect
//! status()      read-only view, safe at any time
//! ```
//!
//! All spawned tasks observe one [`CancellationToken`]. Signal handlers cancel
//! the token; the owner then calls [`WorkerSupervisor::shutdown`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::TaskDispatcher;
use super::failure::FailureHandler;
use super::monitor::Monitor;
use super::poller::{PollerExit, PollerTimings, TopicPoller};
use super::stats::{AggregateStats, StatsSnapshot};
use crate::camunda::EngineClient;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{QueueInfo, QueuePublisher};
use crate::routing::RoutingTable;

/// How a supervised task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    Poller(PollerExit),
    Monitor,
}

#[derive(Debug)]
struct SupervisedTask {
    name: String,
    handle: JoinHandle<TaskExit>,
}

/// Result of the first `shutdown()` call
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    /// Tasks that finished within the join timeout
    pub joined: usize,
    /// Tasks aborted after the join timeout
    pub abandoned: usize,
    pub final_stats: StatsSnapshot,
}

/// Snapshot returned by [`WorkerSupervisor::status`]
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub is_running: bool,
    pub uptime_seconds: f64,
    pub stats: StatsSnapshot,
    pub architecture: &'static str,
    pub active_tasks: usize,
    pub topics: Vec<String>,
    pub lock_duration_minutes: f64,
    pub engine: serde_json::Value,
    pub broker_provider: &'static str,
    pub broker_connected: bool,
    pub queues_info: Option<BTreeMap<String, QueueInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queues_error: Option<String>,
}

#[derive(Debug)]
pub struct WorkerSupervisor {
    config: BridgeConfig,
    engine: Arc<dyn EngineClient>,
    publisher: Arc<dyn QueuePublisher>,
    routing: Arc<RoutingTable>,
    stats: Arc<AggregateStats>,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
    started: AtomicBool,
    shutdown_started: AtomicBool,
    tasks: Mutex<Vec<SupervisedTask>>,
}

impl WorkerSupervisor {
    pub fn new(
        config: BridgeConfig,
        engine: Arc<dyn EngineClient>,
        publisher: Arc<dyn QueuePublisher>,
    ) -> Self {
        let routing = Arc::new(RoutingTable::from_config(&config.routing));
        Self {
            config,
            engine,
            publisher,
            routing,
            stats: Arc::new(AggregateStats::new()),
            cancel: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
            started: AtomicBool::new(false),
            shutdown_started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Token that stops every poller and the monitor when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> Arc<AggregateStats> {
        Arc::clone(&self.stats)
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn topics(&self) -> Vec<String> {
        self.routing.topics().map(str::to_string).collect()
    }

    /// Connect the broker and declare topology; nothing is spawned here
    pub async fn initialize(&self) -> BridgeResult<()> {
        info!("Initializing worker supervisor...");

        if self.routing.is_empty() {
            return Err(BridgeError::initialization(
                "routing",
                "no topics configured under [routing.topics]",
            ));
        }

        self.publisher.connect().await.map_err(|e| {
            error!("Failed to connect to broker: {}", e);
            BridgeError::initialization("broker_connect", e.to_string())
        })?;

        let topics = self.topics();
        self.publisher
            .setup_infrastructure(&topics)
            .await
            .map_err(|e| {
                error!("Failed to declare broker topology: {}", e);
                BridgeError::initialization("broker_topology", e.to_string())
            })?;

        self.initialized.store(true, Ordering::SeqCst);
        info!(topics = ?topics, "✅ Worker supervisor initialized");
        Ok(())
    }

    /// Spawn pollers and monitor, then wait until the token is cancelled
    pub async fn start(&self) -> BridgeResult<()> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(BridgeError::NotInitialized);
        }
        if self.shutdown_started.load(Ordering::SeqCst) {
            return Err(BridgeError::ShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::AlreadyStarted);
        }

        self.stats.mark_started();
        self.running.store(true, Ordering::SeqCst);

        let timings = PollerTimings::from_config(&self.config);
        let failure_handler = FailureHandler::new(
            Arc::clone(&self.publisher),
            Arc::clone(&self.engine),
            &self.config.worker,
        );
        let dispatcher = TaskDispatcher::new(
            Arc::clone(&self.publisher),
            Arc::clone(&self.routing),
            failure_handler,
            Arc::clone(&self.stats),
        );

        let topics = self.topics();
        info!(count = topics.len(), topics = ?topics, "🚀 Starting topic pollers");

        {
            let mut tasks = self.tasks.lock();
            // Shutdown may have drained the task list since the check above
            if self.shutdown_started.load(Ordering::SeqCst) {
                self.running.store(false, Ordering::SeqCst);
                return Err(BridgeError::ShutDown);
            }

            for topic in &topics {
                let poller = TopicPoller::new(
                    topic.clone(),
                    Arc::clone(&self.engine),
                    dispatcher.clone(),
                    Arc::clone(&self.stats),
                    timings,
                    self.cancel.child_token(),
                );
                let handle = tokio::spawn(async move { TaskExit::Poller(poller.run().await) });
                tasks.push(SupervisedTask {
                    name: format!("poller:{}", topic),
                    handle,
                });
            }

            let monitor = Monitor::new(
                Arc::clone(&self.publisher),
                Arc::clone(&self.stats),
                Arc::clone(&self.running),
                self.config.worker.monitor_interval(),
                self.config.worker.monitor_error_retry(),
                self.cancel.child_token(),
            );
            let handle = tokio::spawn(async move {
                monitor.run().await;
                TaskExit::Monitor
            });
            tasks.push(SupervisedTask {
                name: "monitor".to_string(),
                handle,
            });
        }

        info!("Worker started and waiting for tasks...");
        self.cancel.cancelled().await;
        info!("Stop signal received");
        Ok(())
    }

    /// Stop everything once; later calls return `None` immediately
    pub async fn shutdown(&self) -> Option<ShutdownReport> {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already performed");
            return None;
        }

        info!("🛑 Shutting down worker supervisor...");
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let join_timeout = self.config.worker.shutdown_join_timeout();

        let results = join_all(tasks.into_iter().map(|task| join_task(task, join_timeout))).await;
        let joined = results.iter().filter(|joined| **joined).count();
        let abandoned = results.len() - joined;

        self.publisher.disconnect().await;

        let final_stats = self.stats.snapshot();
        info!(
            uptime_secs = final_stats.uptime_seconds as u64,
            processed = final_stats.processed,
            succeeded = final_stats.succeeded,
            failed = final_stats.failed,
            joined = joined,
            abandoned = abandoned,
            "Final statistics"
        );
        info!("✅ Worker supervisor stopped");

        Some(ShutdownReport {
            joined,
            abandoned,
            final_stats,
        })
    }

    /// Read-only status; queue introspection is bounded by the status timeout
    pub async fn status(&self) -> WorkerStatus {
        let stats = self.stats.snapshot();
        let active_tasks = self
            .tasks
            .lock()
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count();

        let status_timeout = self.config.rabbitmq.status_timeout();
        let (queues_info, queues_error) =
            match tokio::time::timeout(status_timeout, self.publisher.queues_info()).await {
                Ok(Ok(info)) => (Some(info), None),
                Ok(Err(e)) => (None, Some(e.to_string())),
                Err(_) => (
                    None,
                    Some(format!(
                        "queue introspection timed out after {}s",
                        status_timeout.as_secs()
                    )),
                ),
            };

        WorkerStatus {
            is_running: self.is_running(),
            uptime_seconds: stats.uptime_seconds,
            stats,
            architecture: "stateless",
            active_tasks,
            topics: self.topics(),
            lock_duration_minutes: self.config.camunda.lock_duration_minutes(),
            engine: self.engine.describe(),
            broker_provider: self.publisher.provider_name(),
            broker_connected: self.publisher.is_connected(),
            queues_info,
            queues_error,
        }
    }
}

/// Join one task within `timeout`, aborting it if it overruns
async fn join_task(task: SupervisedTask, timeout: Duration) -> bool {
    let SupervisedTask { name, mut handle } = task;

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(exit)) => {
            debug!(task = %name, exit = ?exit, "Task joined");
            true
        }
        Ok(Err(e)) => {
            error!(task = %name, "Task ended abnormally: {}", e);
            true
        }
        Err(_) => {
            warn!(
                task = %name,
                timeout_secs = timeout.as_secs(),
                "Task did not stop in time; abandoning"
            );
            handle.abort();
            false
        }
    }
}
