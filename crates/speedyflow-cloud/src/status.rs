//! Canonical instance state and the provider vocabulary mapping

use serde::{Deserialize, Serialize};

/// Provider status strings with a canonical meaning. Matching is exact and case-sensitive.
const STATUS_TABLE: &[(&str, CanonicalState)] = &[
    ("Running", CanonicalState::Running),
    ("Suspended", CanonicalState::Saved),
    ("Stopped", CanonicalState::Stopped),
    ("Provisioning", CanonicalState::Starting),
    ("ERROR", CanonicalState::Error),
];

/// Provider status that aborts any status wait immediately
pub const PROVIDER_ERROR_STATUS: &str = "ERROR";
pub const PROVIDER_RUNNING_STATUS: &str = "Running";
pub const PROVIDER_STOPPED_STATUS: &str = "Stopped";

/// State of an instance, independent of provider vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalState {
    /// Status string not recognised (or not yet observed)
    #[default]
    Unknown,
    Starting,
    Running,
    Stopped,
    /// Suspended by the provider
    Saved,
    /// Terminal provider failure; requires escalation, not retry
    Error,
}

impl CanonicalState {
    /// Map a raw provider status. Unrecognised strings map to `Unknown`.
    pub fn from_provider(status: &str) -> Self {
        map_state(status)
    }

    /// Whether `status` is part of the known provider vocabulary
    pub fn is_known_status(status: &str) -> bool {
        STATUS_TABLE.iter().any(|(s, _)| *s == status)
    }
}

/// Pure mapping from provider status to [`CanonicalState`]
pub fn map_state(status: &str) -> CanonicalState {
    STATUS_TABLE
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, state)| *state)
        .unwrap_or(CanonicalState::Unknown)
}

impl std::fmt::Display for CanonicalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanonicalState::Unknown => write!(f, "Unknown"),
            CanonicalState::Starting => write!(f, "Starting"),
            CanonicalState::Running => write!(f, "Running"),
            CanonicalState::Stopped => write!(f, "Stopped"),
            CanonicalState::Saved => write!(f, "Saved"),
            CanonicalState::Error => write!(f, "Error"),
        }
    }
}
