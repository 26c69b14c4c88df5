//! Execution & Recovery Engine.
//!
//! Drives a validated plan to completion against an unreliable remote
//! actuator: bounded per-step retries with feedback-informed instruction
//! mutation, blackhole detection over a rolling attempt window, a session
//! state machine that decides when to halt, and a terminal classifier
//! that either reports success, requests exactly one improved plan, or
//! hands off to a human with a recovery tutorial.

pub mod blackhole;
pub mod classifier;
pub mod classify;
pub mod config;
pub mod engine;
pub mod errors;
pub mod limiter;
pub mod mutation;
pub mod report;
pub mod runner;
pub mod session;
pub mod tutorial;
pub mod window;

pub use blackhole::{BlackholeDetector, BlackholeReport, SuggestedAction};
pub use classifier::{ErrorCategory, GateDecision, ImprovementGate};
pub use config::EngineConfig;
pub use engine::AutomationEngine;
pub use errors::EngineError;
pub use limiter::RateLimiter;
pub use report::{AutomationReport, RunStatus, StepOutcome, StepStatus};
pub use runner::{StepRun, StepRunner};
pub use session::{generate_session_id, Session, SessionStatus, SessionStore};
pub use tutorial::{TutorialGenerator, TutorialRequest};
pub use window::{AttemptRecord, ErrorDetectionWindow};
