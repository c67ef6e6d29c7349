//! # Camunda REST Client
//!
//! [`EngineClient`] over the Camunda 7 external-task REST API using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

use super::errors::{EngineError, EngineResult};
use super::EngineClient;
use crate::config::CamundaConfig;
use crate::models::{ExternalTask, FailureReport};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchAndLockRequest<'a> {
    worker_id: &'a str,
    max_tasks: u32,
    use_priority: bool,
    async_response_timeout: u64,
    topics: Vec<FetchTopic<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sorting: Option<Vec<SortCriterion<'a>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchTopic<'a> {
    topic_name: &'a str,
    lock_duration: u64,
    deserialize_values: bool,
    include_extension_properties: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SortCriterion<'a> {
    sort_by: &'static str,
    sort_order: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureRequest<'a> {
    worker_id: &'a str,
    error_message: &'a str,
    error_details: &'a str,
    retries: u32,
    retry_timeout: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest<'a> {
    worker_id: &'a str,
    variables: serde_json::Map<String, serde_json::Value>,
}

/// HTTP client for the engine's external-task endpoints
pub struct CamundaClient {
    client: Client,
    base_url: String,
    config: CamundaConfig,
}

impl std::fmt::Debug for CamundaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CamundaClient")
            .field("base_url", &self.base_url)
            .field("worker_id", &self.config.worker_id)
            .field("max_tasks", &self.config.max_tasks)
            .field("auth_enabled", &self.config.auth.enabled)
            .finish()
    }
}

impl CamundaClient {
    pub fn new(config: CamundaConfig) -> EngineResult<Self> {
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            EngineError::configuration(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("camunda-bridge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                EngineError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        info!(
            base_url = %base_url,
            worker_id = %config.worker_id,
            timeout_ms = config.http_timeout_ms,
            "Created CamundaClient"
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/external-task{}", self.base_url, path)
    }

    fn fetch_request<'a>(&'a self, topic: &'a str) -> FetchAndLockRequest<'a> {
        FetchAndLockRequest {
            worker_id: &self.config.worker_id,
            max_tasks: self.config.max_tasks,
            use_priority: self.config.use_priority,
            async_response_timeout: self.config.async_response_timeout_ms,
            topics: vec![FetchTopic {
                topic_name: topic,
                lock_duration: self.config.lock_duration_ms,
                deserialize_values: self.config.deserialize_values,
                include_extension_properties: self.config.include_extension_properties,
            }],
            sorting: self.config.sort_by_create_time.as_deref().map(|order| {
                vec![SortCriterion {
                    sort_by: "createTime",
                    sort_order: order,
                }]
            }),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        url: String,
        body: &B,
    ) -> EngineResult<reqwest::Response> {
        debug!(operation = operation, url = %url, "Sending engine request");

        let mut request = self.client.post(&url).json(body);
        if self.config.auth.enabled {
            request = request.basic_auth(&self.config.auth.username, Some(&self.config.auth.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::transport(operation, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!(
                operation = operation,
                status = status.as_u16(),
                "Engine request failed: {}",
                error_text
            );
            Err(EngineError::http(operation, status.as_u16(), error_text))
        }
    }
}

#[async_trait]
impl EngineClient for CamundaClient {
    async fn fetch_and_lock(&self, topic: &str) -> EngineResult<Vec<ExternalTask>> {
        let body = self.fetch_request(topic);
        let response = self
            .post("fetchAndLock", self.endpoint("/fetchAndLock"), &body)
            .await?;

        let tasks: Vec<ExternalTask> = response
            .json()
            .await
            .map_err(|e| EngineError::decode("fetchAndLock", e.to_string()))?;

        debug!(topic = topic, count = tasks.len(), "Fetched external tasks");
        Ok(tasks)
    }

    async fn report_failure(&self, report: &FailureReport) -> EngineResult<()> {
        let body = FailureRequest {
            worker_id: &self.config.worker_id,
            error_message: &report.error_message,
            error_details: &report.error_details,
            retries: report.retries,
            retry_timeout: report.retry_timeout_ms,
        };

        self.post(
            "failure",
            self.endpoint(&format!("/{}/failure", report.task_id)),
            &body,
        )
        .await?;
        Ok(())
    }

    async fn complete(
        &self,
        task_id: &str,
        variables: serde_json::Map<String, serde_json::Value>,
    ) -> EngineResult<()> {
        let variables = variables
            .into_iter()
            .map(|(name, value)| (name, serde_json::json!({ "value": value })))
            .collect();
        let body = CompleteRequest {
            worker_id: &self.config.worker_id,
            variables,
        };

        self.post(
            "complete",
            self.endpoint(&format!("/{}/complete", task_id)),
            &body,
        )
        .await?;
        Ok(())
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "base_url": self.base_url,
            "worker_id": self.config.worker_id,
            "max_tasks": self.config.max_tasks,
            "lock_duration": self.config.lock_duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> CamundaConfig {
        CamundaConfig {
            base_url: "http://camunda:8080/engine-rest/".to_string(),
            worker_id: "bridge-1".to_string(),
            ..CamundaConfig::default()
        }
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = CamundaClient::new(config()).unwrap();
        assert_eq!(
            client.endpoint("/fetchAndLock"),
            "http://camunda:8080/engine-rest/external-task/fetchAndLock"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = config();
        config.base_url = "not a url".to_string();

        let err = CamundaClient::new(config).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn test_fetch_request_body() {
        let client = CamundaClient::new(config()).unwrap();
        let body = serde_json::to_value(client.fetch_request("credit_check")).unwrap();

        assert_eq!(
            body,
            json!({
                "workerId": "bridge-1",
                "maxTasks": 10,
                "usePriority": true,
                "asyncResponseTimeout": 10000,
                "topics": [{
                    "topicName": "credit_check",
                    "lockDuration": 600000,
                    "deserializeValues": true,
                    "includeExtensionProperties": false
                }]
            })
        );
    }

    #[test]
    fn test_fetch_request_sorting() {
        let mut config = config();
        config.sort_by_create_time = Some("desc".to_string());
        let client = CamundaClient::new(config).unwrap();

        let body = serde_json::to_value(client.fetch_request("t")).unwrap();
        assert_eq!(
            body["sorting"],
            json!([{"sortBy": "createTime", "sortOrder": "desc"}])
        );
    }

    #[test]
    fn test_failure_request_body() {
        let body = serde_json::to_value(FailureRequest {
            worker_id: "bridge-1",
            error_message: "Task processing error: broker down",
            error_details: "broker down",
            retries: 2,
            retry_timeout: 30_000,
        })
        .unwrap();

        assert_eq!(body["errorMessage"], "Task processing error: broker down");
        assert_eq!(body["errorDetails"], "broker down");
        assert_eq!(body["retries"], 2);
        assert_eq!(body["retryTimeout"], 30000);
    }

    #[test]
    fn test_describe_reports_engine_summary() {
        let client = CamundaClient::new(config()).unwrap();
        let summary = client.describe();

        assert_eq!(summary["base_url"], "http://camunda:8080/engine-rest");
        assert_eq!(summary["worker_id"], "bridge-1");
        assert_eq!(summary["lock_duration"], 600000);
    }

    #[tokio::test]
    #[ignore = "requires Camunda running"]
    async fn test_fetch_against_live_engine() {
        let client = CamundaClient::new(CamundaConfig::default()).unwrap();
        let tasks = client.fetch_and_lock("camunda_bridge_smoke").await.unwrap();
        assert!(tasks.iter().all(|t| t.topic_name == "camunda_bridge_smoke"));
    }
}
