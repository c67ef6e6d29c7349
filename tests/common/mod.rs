//! Shared doubles for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use camunda_bridge::camunda::{EngineClient, EngineError, EngineResult};
use camunda_bridge::config::BridgeConfig;
use camunda_bridge::models::{ExternalTask, FailureReport, TypedVariable};

/// Engine double with per-topic scripted batches and failure injection
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    batches: Mutex<HashMap<String, VecDeque<Vec<ExternalTask>>>>,
    failing_topics: Mutex<HashSet<String>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    failure_reports: Mutex<Vec<FailureReport>>,
    completions: Mutex<Vec<String>>,
    hang_fetch: AtomicBool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one fetch result for `topic`; later fetches return nothing
    pub fn push_batch(&self, topic: &str, tasks: Vec<ExternalTask>) {
        self.batches
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push_back(tasks);
    }

    /// Every fetch for `topic` fails with a transport error
    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    pub fn heal_topic(&self, topic: &str) {
        self.failing_topics.lock().remove(topic);
    }

    /// Fetches never return, like a long poll that never answers
    pub fn hang_fetches(&self) {
        self.hang_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fetch_count(&self, topic: &str) -> usize {
        self.fetch_counts.lock().get(topic).copied().unwrap_or(0)
    }

    pub fn failure_reports(&self) -> Vec<FailureReport> {
        self.failure_reports.lock().clone()
    }
}

#[async_trait]
impl EngineClient for ScriptedEngine {
    async fn fetch_and_lock(&self, topic: &str) -> EngineResult<Vec<ExternalTask>> {
        *self.fetch_counts.lock().entry(topic.to_string()).or_default() += 1;

        if self.hang_fetch.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.failing_topics.lock().contains(topic) {
            return Err(EngineError::transport(
                "fetchAndLock",
                format!("connection refused for {}", topic),
            ));
        }

        Ok(self
            .batches
            .lock()
            .get_mut(topic)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn report_failure(&self, report: &FailureReport) -> EngineResult<()> {
        self.failure_reports.lock().push(report.clone());
        Ok(())
    }

    async fn complete(
        &self,
        task_id: &str,
        _variables: serde_json::Map<String, serde_json::Value>,
    ) -> EngineResult<()> {
        self.completions.lock().push(task_id.to_string());
        Ok(())
    }
}

/// Task as the engine would return it
pub fn task(id: &str, topic: &str) -> ExternalTask {
    let mut task = ExternalTask::new(id, topic);
    task.worker_id = Some("bridge-test".to_string());
    task.process_instance_id = Some(format!("pi-{}", id));
    task.activity_id = Some("ServiceTask_1".to_string());
    task.activity_instance_id = Some(format!("ServiceTask_1:{}", id));
    task.retries = Some(3);
    task.create_time = Some("2024-03-01T10:15:00.000+0000".to_string());
    task.priority = 5;
    task.business_key = Some(format!("bk-{}", id));
    task.variables.insert(
        "orderId".to_string(),
        TypedVariable::new(serde_json::json!(id)),
    );
    task
}

/// Configuration routing `topics` with the stock timings
pub fn config_with_topics(topics: &[(&str, &str)]) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.camunda.worker_id = "bridge-test".to_string();
    config.routing.topics = topics
        .iter()
        .map(|(topic, system)| (topic.to_string(), system.to_string()))
        .collect::<BTreeMap<_, _>>();
    config
}
