use thiserror::Error;

/// Structural problems that make a generated plan unusable.
///
/// The engine validates every plan before opening an actuator session and
/// fails fast on the first problem found.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedPlanError {
    #[error("plan has no steps")]
    Empty,

    #[error("step {index} has an empty instruction")]
    EmptyInstruction { index: u32 },

    #[error("step indices must be dense and 1-based, expected {expected} but found {found}")]
    NonDenseIndex { expected: u32, found: u32 },

    #[error("step {index} depends on step {dependency}, which does not precede it")]
    ForwardDependency { index: u32, dependency: u32 },

    #[error("step {index} has priority {priority}, expected 1..=5")]
    InvalidPriority { index: u32, priority: u8 },

    #[error("step {index} pre-condition has an empty check instruction")]
    EmptyPreCondition { index: u32 },

    #[error("plan target site is empty")]
    MissingTargetSite,
}
