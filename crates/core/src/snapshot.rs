use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Risk figures of every configured vault at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Epoch milliseconds at which the snapshot was taken.
    pub time: i64,
    pub deltas: Vec<VaultDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultDelta {
    pub vault: String,
    pub delta: f64,
    pub price: f64,
}

impl Snapshot {
    #[must_use]
    pub fn now(deltas: Vec<VaultDelta>) -> Self {
        Self {
            time: Utc::now().timestamp_millis(),
            deltas,
        }
    }

    /// Wire form pushed to subscribers.
    ///
    /// Non-finite floats are written as `null` rather than rejected, so callers
    /// must keep them out of the store.
    ///
    /// # Errors
    /// Propagates the serializer's error; plain structs of numbers and strings do not produce one.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn get(&self, vault: &str) -> Option<&VaultDelta> {
        self.deltas.iter().find(|d| d.vault == vault)
    }
}
