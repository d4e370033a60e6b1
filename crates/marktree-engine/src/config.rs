//! Engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration for the incremental updater.
///
/// Hosts may persist this alongside their own settings; all fields have
/// conservative defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Edits whose removed span or replacement exceeds this many UTF-16
    /// units are always treated as structural. The value trades unnecessary
    /// full reparses for classification simplicity; it is not load-bearing
    /// for correctness.
    pub structural_length_threshold: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            structural_length_threshold: 100,
        }
    }
}
