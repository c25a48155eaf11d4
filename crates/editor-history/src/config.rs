//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::op;
use crate::stack::DEFAULT_CAPACITY;

/// Tunables for a [`History`](crate::History) engine.
///
/// Hosts usually ship this as JSON next to their editor settings:
///
/// ```rust
/// use editor_history::HistoryConfig;
///
/// let config = HistoryConfig::from_json_str(r#"{ "capacity": 64, "merge_typing": false }"#).unwrap();
/// assert_eq!(config.capacity, 64);
/// assert!(!config.merge_typing);
/// assert_eq!(config.parent_block_ops, HistoryConfig::default().parent_block_ops);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Ring slots of the undo stack; `capacity - 1` records are retained.
    pub capacity: usize,
    /// Fold consecutive text insertions into one undo step.
    pub merge_typing: bool,
    /// Tags treated as block-level in addition to the built-in set.
    pub extra_block_tags: Vec<String>,
    /// Event operation types whose start boundary is widened to the enclosing block.
    pub parent_block_ops: Vec<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            merge_typing: true,
            extra_block_tags: Vec::new(),
            parent_block_ops: vec![
                op::INSERT_LINE_BREAK.to_string(),
                op::INSERT_PARAGRAPH.to_string(),
            ],
        }
    }
}

impl HistoryConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity));
        }
        Ok(())
    }

    /// Returns `true` if `op_type` widens its start boundary to the enclosing block.
    pub fn uses_parent_block(&self, op_type: &str) -> bool {
        self.parent_block_ops.iter().any(|op| op == op_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.capacity, 1024);
        assert!(config.merge_typing);
        assert!(config.uses_parent_block("insertParagraph"));
        assert!(config.uses_parent_block("insertLineBreak"));
        assert!(!config.uses_parent_block("insertText"));
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            HistoryConfig::from_json_str("{}").unwrap(),
            HistoryConfig::default()
        );
    }

    #[test]
    fn test_rejects_tiny_capacity() {
        assert!(matches!(
            HistoryConfig::from_json_str(r#"{ "capacity": 1 }"#),
            Err(ConfigError::CapacityTooSmall(1))
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            HistoryConfig::from_json_str("{ capacity: }"),
            Err(ConfigError::Json(_))
        ));
    }
}
