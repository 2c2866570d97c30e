use thiserror::Error;

use crate::stepper::RunnerId;

/// Raised from inside one program step unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("step did not yield after {limit} evaluations")]
    StepLimitExceeded { limit: usize },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("{runner} failed on step {step}")]
    Program {
        runner: RunnerId,
        step: u64,
        #[source]
        source: ProgramError,
    },
}

impl RunnerError {
    pub fn runner(&self) -> RunnerId {
        match self {
            RunnerError::Program { runner, .. } => *runner,
        }
    }
}
