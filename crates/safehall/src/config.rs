//! Messenger configuration.

use serde::{Deserialize, Serialize};

use safehall_policy::OfficeHours;
use safehall_safety::Lexicon;

use crate::error::{MessengerError, Result};

/// Per-institution settings for a [`Messenger`](crate::Messenger).
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// When students may send non-emergency messages.
    pub office_hours: OfficeHours,
    /// Terms the content analyzer scores.
    pub lexicon: Lexicon,
    /// Whether to write audit events.
    pub audit: bool,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            office_hours: OfficeHours::default(),
            lexicon: Lexicon::standard(),
            audit: true,
        }
    }
}

impl MessengerConfig {
    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MessengerError::Config(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MessengerError::Config(e.to_string()))
    }
}
