//! Record status shared by menus, users and roles

use serde::{Deserialize, Serialize};

/// Lifecycle status of an administrative record. Soft deletion is tracked
/// separately through `removed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Enabled,
    Disabled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Enabled => "enabled",
            RecordStatus::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "enabled" | "1" => Some(RecordStatus::Enabled),
            "disabled" | "2" => Some(RecordStatus::Disabled),
            _ => None,
        }
    }

    /// Storage code: 1 = enabled, 2 = disabled.
    pub fn code(&self) -> i16 {
        match self {
            RecordStatus::Enabled => 1,
            RecordStatus::Disabled => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(RecordStatus::Enabled),
            2 => Some(RecordStatus::Disabled),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, RecordStatus::Enabled)
    }
}
