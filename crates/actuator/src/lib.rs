//! Remote browser actuation interface.
//!
//! Wraps the external capability that executes a natural-language
//! instruction against a live browser and returns a textual result. The
//! engine treats `act` as its one designated suspension point: the call is
//! slow (seconds) and may fail, and implementations backed by a blocking
//! driver are expected to hide a `spawn_blocking` hop behind this trait.
//!
//! Any error raised by `act` is handled by the engine exactly like a
//! textual failure result, so implementations should not retry internally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the actuation layer.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The browser session could not be established.
    #[error("failed to open actuator session: {0}")]
    OpenFailed(String),

    /// A single instruction failed to execute.
    #[error("instruction failed: {0}")]
    ActFailed(String),

    /// The session was closed or lost mid-run.
    #[error("actuator session closed: {0}")]
    SessionClosed(String),
}

/// Result of executing one instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActOutcome {
    /// Textual response the engine classifies for success/failure.
    pub text: String,

    /// Raw structured payload from the remote capability, passed through
    /// untouched for observers.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl ActOutcome {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }
}

/// A live browser session bound to one automation session.
///
/// Sessions are single-owner: the engine never issues concurrent `act`
/// calls on one session.
#[async_trait]
pub trait ActuatorSession: Send {
    /// Execute one natural-language instruction against the live browser.
    async fn act(&mut self, instruction: &str) -> Result<ActOutcome, ActuatorError>;

    /// Release the underlying browser. Idempotent.
    async fn close(&mut self) -> Result<(), ActuatorError>;
}

/// Factory for browser sessions. One session per automation session gives
/// cross-session isolation without locking.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Open a fresh browser session on the given starting page.
    async fn open(&self, starting_page: &str) -> Result<Box<dyn ActuatorSession>, ActuatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_defaults() {
        let outcome = ActOutcome::new("clicked the login button");
        assert_eq!(outcome.text, "clicked the login button");
        assert!(outcome.raw.is_null());
    }

    #[test]
    fn test_outcome_raw_passthrough() {
        let outcome = ActOutcome::new("done")
            .with_raw(serde_json::json!({"matches_schema": true, "response": "done"}));
        assert_eq!(outcome.raw["matches_schema"], true);
    }

    #[test]
    fn test_error_display() {
        let err = ActuatorError::OpenFailed("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
