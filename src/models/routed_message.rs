//! Messages the bridge puts on the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExternalTask;

/// Canonical payload for one task, published to `{queue_prefix}.{topic}`
///
/// Mirrors the leased task plus the resolved downstream system. Built once per
/// dispatch and handed to the publisher by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedTaskMessage {
    pub id: String,
    pub topic: String,
    pub system: String,
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub process_instance_id: Option<String>,
    pub activity_id: Option<String>,
    pub activity_instance_id: Option<String>,
    pub worker_id: Option<String>,
    pub retries: Option<i32>,
    pub create_time: Option<String>,
    pub priority: i64,
    pub tenant_id: Option<String>,
    pub business_key: Option<String>,
}

impl RoutedTaskMessage {
    /// Build the payload for `task` fetched under `topic` and routed to `system`
    pub fn from_task(task: &ExternalTask, topic: &str, system: &str) -> Self {
        Self {
            id: task.id.clone(),
            topic: topic.to_string(),
            system: system.to_string(),
            variables: task.plain_variables(),
            process_instance_id: task.process_instance_id.clone(),
            activity_id: task.activity_id.clone(),
            activity_instance_id: task.activity_instance_id.clone(),
            worker_id: task.worker_id.clone(),
            retries: task.retries,
            create_time: task.create_time.clone(),
            priority: task.priority,
            tenant_id: task.tenant_id.clone(),
            business_key: task.business_key.clone(),
        }
    }
}

/// Observability event published to the error exchange when a task fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskErrorEvent {
    pub task_id: String,
    pub topic: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl TaskErrorEvent {
    pub fn new(task_id: impl Into<String>, topic: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            topic: topic.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Failure report sent back to the engine for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub task_id: String,
    pub error_message: String,
    pub error_details: String,
    pub retries: u32,
    pub retry_timeout_ms: u64,
}
