// Execution Engine Module
// Handles matrix expansion, plan orchestration, and progress reporting

pub mod events;
pub mod executor;
pub mod matrix;
pub mod results;

// Re-export key types
pub use events::{progress_channel, EventSender, ExecutionEvent, LogLevel, ProgressReceiver, ProgressSender};
pub use executor::{ExecutorConfig, MatrixExecutor, ENV_NAME_VAR};
pub use matrix::{ExecutionPlan, MatrixExpander};
pub use results::{
    CommandFailure, CommandResult, CommandStatus, EnvStatus, MatrixResult, PlanResult,
};
