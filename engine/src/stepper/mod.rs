mod agent;
mod execution;
mod runner;

pub use agent::{AgentControl, Facing, Marker, Position, Rotation, SharedAgent, ThingAhead};
pub use execution::{ExecutionState, Snapshot};
pub use runner::{
    CompletionHook, DEFAULT_INTERVAL, INTERVAL_STEP, MAX_INTERVAL, MIN_INTERVAL, RunOutcome,
    RunReport, Runner, RunnerId, RunnerPhase, SharedRunner, StepProgram, Tick, clamp_interval,
};
