//! # In-Memory Queue Publisher
//!
//! Thread-safe in-process [`QueuePublisher`] for tests and `--dry-run`.
//!
//! Queues are `VecDeque`s behind a `tokio::sync::RwLock`. Each failure mode
//! (connect, publish, error publish, reconnect) can be switched on at
//! runtime, and a publish delay simulates a slow broker. Each queue keeps at
//! most [`DEFAULT_MAX_RETAINED`] messages; older ones are dropped first so a
//! long `--dry-run` stays bounded.
//!
//! ```rust
//! use camunda_bridge::messaging::{InMemoryQueuePublisher, QueuePublisher};
//! use camunda_bridge::models::{ExternalTask, RoutedTaskMessage};
//!
//! # tokio_test::block_on(async {
//! let publisher = InMemoryQueuePublisher::default();
//! publisher.connect().await.unwrap();
//!
//! let task = ExternalTask::new("t-1", "send_invoice");
//! let message = RoutedTaskMessage::from_task(&task, "send_invoice", "billing");
//! publisher.publish("send_invoice", &message).await.unwrap();
//!
//! assert_eq!(publisher.messages("send_invoice").await.len(), 1);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::errors::{MessagingError, MessagingResult};
use super::{QueueInfo, QueuePublisher};
use crate::config::RabbitmqConfig;
use crate::models::{RoutedTaskMessage, TaskErrorEvent};

/// Messages kept per queue before the oldest is dropped
pub const DEFAULT_MAX_RETAINED: usize = 10_000;

#[derive(Debug, Default)]
struct Queues {
    tasks: HashMap<String, VecDeque<RoutedTaskMessage>>,
    errors: VecDeque<TaskErrorEvent>,
}

#[derive(Debug)]
pub struct InMemoryQueuePublisher {
    config: RabbitmqConfig,
    queues: RwLock<Queues>,
    max_retained: usize,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    fail_publish: AtomicBool,
    fail_error_publish: AtomicBool,
    fail_reconnect: AtomicBool,
    publish_delay_ms: AtomicU64,
    publish_attempts: AtomicUsize,
    error_publish_attempts: AtomicUsize,
    reconnect_attempts: AtomicUsize,
}

impl Default for InMemoryQueuePublisher {
    fn default() -> Self {
        Self::new(RabbitmqConfig::default())
    }
}

impl InMemoryQueuePublisher {
    /// Queue names follow `config` the same way the RabbitMQ publisher does
    pub fn new(config: RabbitmqConfig) -> Self {
        Self {
            config,
            queues: RwLock::new(Queues::default()),
            max_retained: DEFAULT_MAX_RETAINED,
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            fail_error_publish: AtomicBool::new(false),
            fail_reconnect: AtomicBool::new(false),
            publish_delay_ms: AtomicU64::new(0),
            publish_attempts: AtomicUsize::new(0),
            error_publish_attempts: AtomicUsize::new(0),
            reconnect_attempts: AtomicUsize::new(0),
        }
    }

    /// Keep at most `max_retained` messages per queue (minimum one)
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained.max(1);
        self
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_error_publish(&self, fail: bool) {
        self.fail_error_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reconnect(&self, fail: bool) {
        self.fail_reconnect.store(fail, Ordering::SeqCst);
    }

    /// Force the connectivity flag, e.g. to simulate a dropped connection
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Delay every task publish, without holding any lock while waiting
    pub fn set_publish_delay(&self, delay: Duration) {
        self.publish_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Messages published for `topic`, oldest first
    pub async fn messages(&self, topic: &str) -> Vec<RoutedTaskMessage> {
        let queue_name = self.config.queue_for_topic(topic);
        self.queues
            .read()
            .await
            .tasks
            .get(&queue_name)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn error_events(&self) -> Vec<TaskErrorEvent> {
        self.queues.read().await.errors.iter().cloned().collect()
    }

    pub fn publish_attempts(&self) -> usize {
        self.publish_attempts.load(Ordering::SeqCst)
    }

    pub fn error_publish_attempts(&self) -> usize {
        self.error_publish_attempts.load(Ordering::SeqCst)
    }

    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueuePublisher for InMemoryQueuePublisher {
    async fn connect(&self) -> MessagingResult<()> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(MessagingError::connection("injected connection failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn setup_infrastructure(&self, topics: &[String]) -> MessagingResult<()> {
        if !self.is_connected() {
            return Err(MessagingError::not_connected());
        }

        let mut queues = self.queues.write().await;
        for topic in topics {
            queues
                .tasks
                .entry(self.config.queue_for_topic(topic))
                .or_default();
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, message: &RoutedTaskMessage) -> MessagingResult<()> {
        self.publish_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = self.publish_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.is_connected() {
            return Err(MessagingError::not_connected());
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(MessagingError::publish(
                &self.config.task_exchange,
                topic,
                "injected publish failure",
            ));
        }

        let queue_name = self.config.queue_for_topic(topic);
        let mut queues = self.queues.write().await;
        let queue = queues.tasks.entry(queue_name.clone()).or_default();
        queue.push_back(message.clone());
        while queue.len() > self.max_retained {
            queue.pop_front();
        }

        debug!(task_id = %message.id, queue = %queue_name, "Stored task message in memory");
        Ok(())
    }

    async fn publish_error(&self, event: &TaskErrorEvent) -> MessagingResult<()> {
        self.error_publish_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.is_connected() {
            return Err(MessagingError::not_connected());
        }
        if self.fail_error_publish.load(Ordering::SeqCst) {
            return Err(MessagingError::publish(
                &self.config.error_exchange,
                "",
                "injected error publish failure",
            ));
        }

        let mut queues = self.queues.write().await;
        queues.errors.push_back(event.clone());
        while queues.errors.len() > self.max_retained {
            queues.errors.pop_front();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> MessagingResult<()> {
        self.reconnect_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_reconnect.load(Ordering::SeqCst) {
            return Err(MessagingError::connection("injected reconnect failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn queues_info(&self) -> MessagingResult<BTreeMap<String, QueueInfo>> {
        let queues = self.queues.read().await;

        let mut info: BTreeMap<String, QueueInfo> = queues
            .tasks
            .iter()
            .map(|(name, queue)| {
                (
                    name.clone(),
                    QueueInfo {
                        message_count: queue.len() as u32,
                        consumer_count: 0,
                        exists: true,
                    },
                )
            })
            .collect();

        info.insert(
            self.config.error_queue.clone(),
            QueueInfo {
                message_count: queues.errors.len() as u32,
                consumer_count: 0,
                exists: true,
            },
        );

        Ok(info)
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
