//! Sync configuration and connectivity state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use offsync_common::{Error, Result};

/// Configuration for the sync core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum age in hours before cached data must be refreshed.
    pub record_ttl_hours: f64,
    /// Whether reads may enqueue background refresh work at all.
    pub background_refresh: bool,
}

impl SyncConfig {
    /// Create a configuration with the given TTL and background refresh enabled.
    pub fn new(record_ttl_hours: f64) -> Self {
        Self {
            record_ttl_hours,
            background_refresh: true,
        }
    }

    /// Disable background refresh: reads never schedule remote work.
    pub fn without_background_refresh(mut self) -> Self {
        self.background_refresh = false;
        self
    }

    /// Validate the configuration.
    ///
    /// Called at orchestrator construction so misconfiguration fails fast
    /// instead of surfacing mid-operation.
    ///
    /// # Errors
    /// - `Error::Config` if the TTL is not a finite, non-negative number
    pub fn validate(&self) -> Result<()> {
        if !self.record_ttl_hours.is_finite() || self.record_ttl_hours < 0.0 {
            return Err(Error::Config(format!(
                "record_ttl_hours must be finite and non-negative, got {}",
                self.record_ttl_hours
            )));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            record_ttl_hours: 24.0,
            background_refresh: true,
        }
    }
}

/// Read-accessor over externally-owned connectivity state.
///
/// The host flips the flag as connectivity changes; the sync core only
/// ever reads it. Cloned handles share the same underlying flag.
#[derive(Debug, Clone)]
pub struct OnlineFlag(Arc<AtomicBool>);

impl OnlineFlag {
    /// Create a new flag with the given initial state.
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Update the connectivity state.
    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Default for OnlineFlag {
    // Offline until the host says otherwise.
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_is_valid() {
        assert!(SyncConfig::new(0.0).validate().is_ok());
    }

    #[test]
    fn test_negative_ttl_fails() {
        let err = SyncConfig::new(-1.0).validate().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_nan_ttl_fails() {
        assert!(SyncConfig::new(f64::NAN).validate().is_err());
        assert!(SyncConfig::new(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_online_flag_shared_between_clones() {
        let flag = OnlineFlag::new(true);
        let clone = flag.clone();

        assert!(clone.is_online());
        flag.set_online(false);
        assert!(!clone.is_online());
    }
}
