//! # Engine Client
//!
//! The bridge talks to the workflow engine through [`EngineClient`]; the REST
//! implementation is [`CamundaClient`]. Workers and tests depend only on the
//! trait.

pub mod client;
pub mod errors;

use async_trait::async_trait;

use crate::models::{ExternalTask, FailureReport};

pub use client::CamundaClient;
pub use errors::{EngineError, EngineResult};

/// External-task operations against the workflow engine
#[async_trait]
pub trait EngineClient: Send + Sync + std::fmt::Debug {
    /// Fetch and lock up to the configured number of tasks for `topic`
    async fn fetch_and_lock(&self, topic: &str) -> EngineResult<Vec<ExternalTask>>;

    /// Release the lock on a task and record the failure with the engine
    async fn report_failure(&self, report: &FailureReport) -> EngineResult<()>;

    /// Complete a task with output variables
    ///
    /// Not used by the polling core; exposed for whatever relays downstream
    /// completion back to the engine.
    async fn complete(
        &self,
        task_id: &str,
        variables: serde_json::Map<String, serde_json::Value>,
    ) -> EngineResult<()>;

    /// Short description for status output
    fn describe(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
