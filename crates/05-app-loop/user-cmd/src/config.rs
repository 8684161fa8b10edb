//! Manager configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_USER_CMD_TOPIC: &str = "~/user_cmd";
pub const DEFAULT_UNDO_REDO_TOPIC: &str = "~/undo_redo";
pub const DEFAULT_STATS_TOPIC: &str = "~/user_cmd_stats";

/// When the stats publisher emits after a drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPolicy {
    /// Emit only if the stats differ from the last emitted message.
    #[default]
    OnChange,
    /// Emit after every drain that processed at least one request.
    Always,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub user_cmd: String,
    pub undo_redo: String,
    pub stats: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            user_cmd: DEFAULT_USER_CMD_TOPIC.to_owned(),
            undo_redo: DEFAULT_UNDO_REDO_TOPIC.to_owned(),
            stats: DEFAULT_STATS_TOPIC.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub topics: TopicConfig,
    pub stats_policy: StatsPolicy,
    /// Include per-command summaries in stats messages.
    pub stats_detail: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            topics: TopicConfig::default(),
            stats_policy: StatsPolicy::default(),
            stats_detail: true,
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let topics = [
            ("user_cmd", &self.topics.user_cmd),
            ("undo_redo", &self.topics.undo_redo),
            ("stats", &self.topics.stats),
        ];
        for (field, topic) in topics {
            if topic.is_empty() {
                return Err(ConfigError::EmptyTopic(field));
            }
        }
        for (i, (_, a)) in topics.iter().enumerate() {
            if topics[i + 1..].iter().any(|(_, b)| a == b) {
                return Err(ConfigError::DuplicateTopic((*a).clone()));
            }
        }
        Ok(())
    }
}
