use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One freshly placed media file a server should pick up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTarget {
    /// Display title, used for logging only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub target_path: PathBuf,
}

impl RefreshTarget {
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            title: None,
            target_path: target_path.into(),
        }
    }
}
