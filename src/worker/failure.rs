//! Failure Handler
//!
//! Last stop for a task that could not be handed to the broker. Emits a
//! best-effort error event, then releases the task back to the engine with a
//! reduced retry budget. Nothing escapes [`FailureHandler::handle`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, warn};

use crate::camunda::EngineClient;
use crate::config::WorkerConfig;
use crate::logging::log_task_operation;
use crate::messaging::QueuePublisher;
use crate::models::{FailureReport, TaskErrorEvent};

/// What the handler managed to do for one failed task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureResolution {
    pub error_event_published: bool,
    pub engine_notified: bool,
}

#[derive(Debug, Clone)]
pub struct FailureHandler {
    publisher: Arc<dyn QueuePublisher>,
    engine: Arc<dyn EngineClient>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl FailureHandler {
    pub fn new(
        publisher: Arc<dyn QueuePublisher>,
        engine: Arc<dyn EngineClient>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            publisher,
            engine,
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
        }
    }

    /// Retries reported to the engine
    pub fn remaining_retries(&self) -> u32 {
        self.retry_attempts.saturating_sub(1)
    }

    pub fn failure_report(&self, task_id: &str, error: &str) -> FailureReport {
        FailureReport {
            task_id: task_id.to_string(),
            error_message: format!("Task processing error: {}", error),
            error_details: error.to_string(),
            retries: self.remaining_retries(),
            retry_timeout_ms: u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub async fn handle(&self, task_id: &str, topic: &str, error: &str) -> FailureResolution {
        error!(task_id = %task_id, topic = %topic, error = %error, "Task processing failed");

        match AssertUnwindSafe(self.resolve(task_id, topic, error))
            .catch_unwind()
            .await
        {
            Ok(resolution) => resolution,
            Err(_) => {
                error!(
                    task_id = %task_id,
                    topic = %topic,
                    "Failure handling panicked; task stays locked until its lease expires"
                );
                FailureResolution::default()
            }
        }
    }

    async fn resolve(&self, task_id: &str, topic: &str, error: &str) -> FailureResolution {
        let mut resolution = FailureResolution::default();

        let event = TaskErrorEvent::new(task_id, topic, error);
        match self.publisher.publish_error(&event).await {
            Ok(()) => resolution.error_event_published = true,
            Err(e) => warn!(
                task_id = %task_id,
                topic = %topic,
                "Could not publish error event: {}", e
            ),
        }

        let report = self.failure_report(task_id, error);
        match self.engine.report_failure(&report).await {
            Ok(()) => {
                resolution.engine_notified = true;
                warn!(
                    task_id = %task_id,
                    topic = %topic,
                    retries = report.retries,
                    retry_timeout_ms = report.retry_timeout_ms,
                    "Task returned to engine with failure"
                );
                log_task_operation("failure_reported", task_id, topic, "failed", Some(error));
            }
            Err(e) => error!(
                task_id = %task_id,
                topic = %topic,
                "Failed to report task failure to engine: {}", e
            ),
        }

        resolution
    }
}
