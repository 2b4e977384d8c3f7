//! Blueprint metadata carried from config into state

use serde::{Deserialize, Serialize};

/// Descriptive metadata attached to a config. Opaque to the engine; it is
/// parsed, persisted at the top of the state document and handed back to
/// the caller of apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
