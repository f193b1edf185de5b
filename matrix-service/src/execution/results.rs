// Execution Results
// Per-command, per-environment and aggregate outcomes

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Command execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Succeeded,
    Failed,
    /// Not run because an earlier command of the same plan failed
    Skipped,
}

/// Environment execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvStatus {
    Succeeded,
    Failed,
    /// Not started (fail-fast after another environment failed)
    Skipped,
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvStatus::Succeeded => write!(f, "succeeded"),
            EnvStatus::Failed => write!(f, "failed"),
            EnvStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A command that stopped its plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFailure {
    pub env_name: String,
    /// Zero-based index into the plan's commands
    pub command_index: usize,
    pub command: String,
    pub exit_code: Option<i32>,
    /// Human readable cause
    pub reason: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: command {} '{}' failed: {}",
            self.env_name,
            self.command_index + 1,
            self.command,
            self.reason
        )
    }
}

impl std::error::Error for CommandFailure {}

/// Result of running one command
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub index: usize,
    pub command: String,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub(crate) fn skipped(index: usize, command: &str) -> Self {
        Self {
            index,
            command: command.to_string(),
            status: CommandStatus::Skipped,
            exit_code: None,
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Result of running one plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub env_name: String,
    pub status: EnvStatus,
    pub commands: Vec<CommandResult>,
    pub duration: Duration,
    /// First failing command, if any
    pub failure: Option<CommandFailure>,
}

impl PlanResult {
    pub(crate) fn skipped(env_name: &str) -> Self {
        Self {
            env_name: env_name.to_string(),
            status: EnvStatus::Skipped,
            commands: Vec::new(),
            duration: Duration::ZERO,
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == EnvStatus::Succeeded
    }
}

/// Aggregate result of running a matrix
#[derive(Debug, Clone, Serialize)]
pub struct MatrixResult {
    /// Plan results in declared order
    pub plans: Vec<PlanResult>,
    pub duration: Duration,
    pub success: bool,
}

impl MatrixResult {
    /// Process exit code: 0 when every environment succeeded
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }

    /// First failure in declared order
    pub fn first_failure(&self) -> Option<&CommandFailure> {
        self.plans.iter().find_map(|p| p.failure.as_ref())
    }

    pub fn count(&self, status: EnvStatus) -> usize {
        self.plans.iter().filter(|p| p.status == status).count()
    }
}
