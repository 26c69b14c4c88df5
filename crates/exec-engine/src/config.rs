//! Configuration for plan execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Total step failures in one session before escalating to a human.
    /// Default: 3
    pub human_intervention_threshold: u32,

    /// Fixed backoff between retry attempts of one step, in milliseconds.
    /// Default: 2000
    pub retry_backoff_ms: u64,

    /// Delay between consecutive steps, in milliseconds.
    /// Default: 1000
    pub step_delay_ms: u64,

    /// Hard wall-clock bound on one whole plan run, in milliseconds.
    /// Exceeding it is a terminal failure that requires a human.
    /// Default: 300000 (5 minutes)
    pub overall_timeout_ms: u64,

    /// Minimum interval between calls to the external reasoning service,
    /// in milliseconds. Shared across sessions.
    /// Default: 3000
    pub reasoning_min_interval_ms: u64,

    /// Prefix for generated session identifiers.
    /// Default: "session"
    pub session_id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            human_intervention_threshold: 3,
            retry_backoff_ms: 2_000,
            step_delay_ms: 1_000,
            overall_timeout_ms: 300_000,
            reasoning_min_interval_ms: 3_000,
            session_id_prefix: "session".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with all delays zeroed, for tests.
    pub fn minimal() -> Self {
        Self {
            human_intervention_threshold: 3,
            retry_backoff_ms: 0,
            step_delay_ms: 0,
            overall_timeout_ms: 30_000,
            reasoning_min_interval_ms: 0,
            session_id_prefix: "test".to_string(),
        }
    }

    /// Builder: set the human intervention threshold.
    pub fn intervention_threshold(mut self, threshold: u32) -> Self {
        self.human_intervention_threshold = threshold;
        self
    }

    /// Builder: set the overall wall-clock timeout.
    pub fn overall_timeout(mut self, ms: u64) -> Self {
        self.overall_timeout_ms = ms;
        self
    }

    /// Builder: set the retry backoff.
    pub fn retry_backoff(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }

    pub fn retry_backoff_duration(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn step_delay_duration(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn overall_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn reasoning_min_interval_duration(&self) -> Duration {
        Duration::from_millis(self.reasoning_min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.human_intervention_threshold, 3);
        assert_eq!(config.retry_backoff_ms, 2_000);
        assert_eq!(config.overall_timeout_ms, 300_000);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .intervention_threshold(5)
            .overall_timeout(60_000);
        assert_eq!(config.human_intervention_threshold, 5);
        assert_eq!(config.overall_timeout_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_minimal_has_no_delays() {
        let config = EngineConfig::minimal();
        assert_eq!(config.retry_backoff_ms, 0);
        assert_eq!(config.step_delay_ms, 0);
    }
}
