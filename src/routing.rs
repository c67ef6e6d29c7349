//! Topic routing table.
//!
//! Immutable topic to downstream-system mapping, built once from
//! [`RoutingConfig`] and shared read-only by every poller.

use std::collections::BTreeMap;

use crate::config::RoutingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    topics: BTreeMap<String, String>,
    default_system: String,
}

impl RoutingTable {
    pub fn new(topics: BTreeMap<String, String>, default_system: impl Into<String>) -> Self {
        Self {
            topics,
            default_system: default_system.into(),
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.topics.clone(), config.default_system.clone())
    }

    /// System for `topic`; unmapped topics resolve to the default system
    pub fn system_for(&self, topic: &str) -> &str {
        self.topics
            .get(topic)
            .map(String::as_str)
            .unwrap_or(&self.default_system)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Known topics in sorted order
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn default_system(&self) -> &str {
        &self.default_system
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        let mut topics = BTreeMap::new();
        topics.insert("send_invoice".to_string(), "billing".to_string());
        topics.insert("credit_check".to_string(), "scoring".to_string());
        RoutingTable::new(topics, "unknown")
    }

    #[test]
    fn test_known_topic_resolves() {
        assert_eq!(table().system_for("send_invoice"), "billing");
    }

    #[test]
    fn test_unknown_topic_uses_default() {
        let table = table();
        assert_eq!(table.system_for("ship_parcel"), "unknown");
        assert!(!table.contains("ship_parcel"));
    }

    #[test]
    fn test_topics_are_ordered() {
        let topics: Vec<_> = table().topics().map(str::to_string).collect();
        assert_eq!(topics, vec!["credit_check", "send_invoice"]);
    }

    #[test]
    fn test_from_config() {
        let mut config = RoutingConfig::default();
        config.default_system = "fallback".to_string();
        config
            .topics
            .insert("a".to_string(), "sys-a".to_string());

        let table = RoutingTable::from_config(&config);
        assert_eq!(table.len(), 1);
        assert_eq!(table.system_for("b"), "fallback");
        assert_eq!(table.default_system(), "fallback");
    }
}
