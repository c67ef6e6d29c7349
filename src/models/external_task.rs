//! External task as returned by the engine's fetch-and-lock call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One typed process variable (`{"value": .., "type": "String", "valueInfo": {..}}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedVariable {
    #[serde(default)]
    pub value: serde_json::Value,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_info: Option<serde_json::Value>,
}

impl TypedVariable {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            var_type: None,
            value_info: None,
        }
    }
}

/// A task leased from the engine
///
/// Valid only while this worker holds its lock; lock expiry and retry counters
/// are owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    pub id: String,

    #[serde(default)]
    pub topic_name: String,

    #[serde(default)]
    pub worker_id: Option<String>,

    #[serde(default)]
    pub process_instance_id: Option<String>,

    #[serde(default)]
    pub process_definition_key: Option<String>,

    #[serde(default)]
    pub activity_id: Option<String>,

    #[serde(default)]
    pub activity_instance_id: Option<String>,

    #[serde(default)]
    pub execution_id: Option<String>,

    #[serde(default)]
    pub variables: HashMap<String, TypedVariable>,

    /// Engine-owned retry counter; `None` until the first failure report
    #[serde(default)]
    pub retries: Option<i32>,

    #[serde(default)]
    pub create_time: Option<String>,

    #[serde(default)]
    pub priority: i64,

    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub business_key: Option<String>,
}

impl ExternalTask {
    /// Task with only the identifying fields set
    pub fn new(id: impl Into<String>, topic_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic_name: topic_name.into(),
            worker_id: None,
            process_instance_id: None,
            process_definition_key: None,
            activity_id: None,
            activity_instance_id: None,
            execution_id: None,
            variables: HashMap::new(),
            retries: None,
            create_time: None,
            priority: 0,
            tenant_id: None,
            business_key: None,
        }
    }

    /// Variables flattened to their plain values
    pub fn plain_variables(&self) -> serde_json::Map<String, serde_json::Value> {
        self.variables
            .iter()
            .map(|(name, var)| (name.clone(), var.value.clone()))
            .collect()
    }
}
