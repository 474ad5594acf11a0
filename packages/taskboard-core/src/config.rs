/// Engine configuration shared by every front-end.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::DEFAULT_LIST_NAMES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskboardConfig {
    /// Directory holding the persisted collections. Front-ends pick a
    /// platform default when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Lists created with every new board, in display order.
    #[serde(default = "default_lists")]
    pub default_lists: Vec<String>,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

fn default_lists() -> Vec<String> {
    DEFAULT_LIST_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_min_password_len() -> usize {
    6
}

impl Default for TaskboardConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_lists: default_lists(),
            min_password_len: default_min_password_len(),
        }
    }
}
