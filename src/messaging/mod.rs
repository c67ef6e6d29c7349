//! # Messaging
//!
//! Broker side of the bridge. [`QueuePublisher`] is the seam the workers use;
//! [`RabbitMqQueuePublisher`] talks AMQP through lapin and
//! [`InMemoryQueuePublisher`] keeps everything in process for tests and dry runs.
//!
//! Topology:
//!
//! ```text
//! task_exchange (direct) --topic--> {queue_prefix}.{topic}
//! error_exchange (fanout) --------> error_queue
//! ```

pub mod errors;
pub mod in_memory;
pub mod rabbitmq;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{RoutedTaskMessage, TaskErrorEvent};

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryQueuePublisher;
pub use rabbitmq::RabbitMqQueuePublisher;

/// Message and consumer counts for one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueInfo {
    pub message_count: u32,
    pub consumer_count: u32,
    /// `false` when the queue has not been declared on the broker
    pub exists: bool,
}

impl QueueInfo {
    pub fn missing() -> Self {
        Self::default()
    }

    /// Messages are waiting but nobody consumes them
    pub fn is_stalled(&self) -> bool {
        self.message_count > 0 && self.consumer_count == 0
    }
}

/// Broker operations used by the bridge
///
/// Implementations use interior mutability; one instance is shared by every
/// poller, the monitor and status queries.
#[async_trait]
pub trait QueuePublisher: Send + Sync + std::fmt::Debug {
    async fn connect(&self) -> MessagingResult<()>;

    /// Declare exchanges and per-topic queues; safe to repeat
    async fn setup_infrastructure(&self, topics: &[String]) -> MessagingResult<()>;

    /// Publish a routed task to the queue for `topic`
    async fn publish(&self, topic: &str, message: &RoutedTaskMessage) -> MessagingResult<()>;

    async fn publish_error(&self, event: &TaskErrorEvent) -> MessagingResult<()>;

    /// Current connectivity; never waits on in-flight operations
    fn is_connected(&self) -> bool;

    /// Drop the current session, connect again and redeclare the topology
    async fn reconnect(&self) -> MessagingResult<()>;

    async fn disconnect(&self);

    /// Counts for every task queue and the error queue, keyed by queue name
    async fn queues_info(&self) -> MessagingResult<BTreeMap<String, QueueInfo>>;

    fn provider_name(&self) -> &'static str;
}
