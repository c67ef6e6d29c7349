//! Task Dispatcher
//!
//! Turns one leased task into a [`RoutedTaskMessage`] and hands it to the
//! broker. A published task keeps its engine lock; the downstream system owns
//! what happens next. A failed publish goes to the [`FailureHandler`] and is
//! never retried here.

use std::sync::Arc;

use tracing::info;

use super::failure::FailureHandler;
use super::stats::{AggregateStats, TaskOutcome};
use crate::logging::log_task_operation;
use crate::messaging::QueuePublisher;
use crate::models::{ExternalTask, RoutedTaskMessage};
use crate::routing::RoutingTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Message confirmed by the broker; the task stays locked
    Published { system: String },
    /// Handed to the failure handler
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    publisher: Arc<dyn QueuePublisher>,
    routing: Arc<RoutingTable>,
    failure_handler: FailureHandler,
    stats: Arc<AggregateStats>,
}

impl TaskDispatcher {
    pub fn new(
        publisher: Arc<dyn QueuePublisher>,
        routing: Arc<RoutingTable>,
        failure_handler: FailureHandler,
        stats: Arc<AggregateStats>,
    ) -> Self {
        Self {
            publisher,
            routing,
            failure_handler,
            stats,
        }
    }

    pub async fn dispatch(&self, task: &ExternalTask, topic: &str) -> DispatchOutcome {
        self.stats.task_started();

        let system = self.routing.system_for(topic);
        info!(
            task_id = %task.id,
            topic = %topic,
            system = %system,
            "Routing task"
        );

        let message = RoutedTaskMessage::from_task(task, topic, system);

        match self.publisher.publish(topic, &message).await {
            Ok(()) => {
                self.stats.record_outcome(TaskOutcome::Succeeded);
                info!(
                    task_id = %task.id,
                    topic = %topic,
                    system = %system,
                    "Task published; remains locked awaiting the downstream system"
                );
                log_task_operation("dispatch", &task.id, topic, "published", Some(system));
                DispatchOutcome::Published {
                    system: system.to_string(),
                }
            }
            Err(e) => {
                let error = e.to_string();
                self.failure_handler.handle(&task.id, topic, &error).await;
                self.stats.record_outcome(TaskOutcome::Failed);
                DispatchOutcome::Failed { error }
            }
        }
    }
}
