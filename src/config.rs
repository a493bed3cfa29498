//! Provider tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::events::DEFAULT_DEBOUNCE_MS;

/// How long a rename waits for the store to settle, in milliseconds. The
/// store confirms renames only eventually and exposes no signal to poll.
pub const DEFAULT_RENAME_SETTLE_MS: u64 = 1500;

/// Configuration for a [`crate::provider::RowFsProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Quiescent interval before a change-event batch is flushed.
    pub debounce_ms: u64,
    /// Fixed delay imposed after a rename before the call returns.
    pub rename_settle_ms: u64,
}

impl ProviderConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn rename_settle(&self) -> Duration {
        Duration::from_millis(self.rename_settle_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            rename_settle_ms: DEFAULT_RENAME_SETTLE_MS,
        }
    }
}
