//! Configuration for in-process records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Value a freshly created record starts with.
    /// Default: `{}`
    pub initial_value: Value,

    /// Whether the record is ready on creation. When false, call
    /// `LocalRecord::mark_ready` once the initial state is loaded.
    /// Default: true
    pub ready: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            initial_value: Value::Object(serde_json::Map::new()),
            ready: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RecordConfig = serde_json::from_value(json!({"ready": false})).unwrap();
        assert!(!config.ready);
        assert_eq!(config.initial_value, json!({}));
    }
}
