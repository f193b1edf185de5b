// Execution Events
// Progress reporting and event types for matrix execution

use crate::execution::results::{CommandStatus, EnvStatus};

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during matrix execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Matrix execution started
    MatrixStarted { total_envs: usize },

    /// Matrix execution completed
    MatrixCompleted { success: bool, duration: Duration },

    /// Environment started
    EnvStarted {
        env_name: String,
        total_commands: usize,
    },

    /// Dependencies the environment declares (installation is external)
    EnvDependencies {
        env_name: String,
        deps: Vec<String>,
        usedevelop: bool,
    },

    /// Environment completed
    EnvCompleted {
        env_name: String,
        status: EnvStatus,
        duration: Duration,
    },

    /// Environment not started
    EnvSkipped { env_name: String, reason: String },

    /// Command started
    CommandStarted {
        env_name: String,
        command_index: usize,
        command: String,
    },

    /// One line of command output
    CommandOutput {
        env_name: String,
        command_index: usize,
        output: String,
        is_error: bool,
    },

    /// Command completed
    CommandCompleted {
        env_name: String,
        command_index: usize,
        status: CommandStatus,
        duration: Duration,
        exit_code: Option<i32>,
    },

    /// Command not run because an earlier one failed
    CommandSkipped {
        env_name: String,
        command_index: usize,
        reason: String,
    },

    /// Log message (info, warning, error)
    Log {
        level: LogLevel,
        message: String,
        env_name: Option<String>,
    },
}

/// Log level for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl ExecutionEvent {
    pub fn matrix_started(total_envs: usize) -> Self {
        Self::MatrixStarted { total_envs }
    }

    pub fn matrix_completed(success: bool, duration: Duration) -> Self {
        Self::MatrixCompleted { success, duration }
    }

    pub fn env_started(env_name: impl Into<String>, total_commands: usize) -> Self {
        Self::EnvStarted {
            env_name: env_name.into(),
            total_commands,
        }
    }

    pub fn env_completed(env_name: impl Into<String>, status: EnvStatus, duration: Duration) -> Self {
        Self::EnvCompleted {
            env_name: env_name.into(),
            status,
            duration,
        }
    }

    pub fn env_skipped(env_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvSkipped {
            env_name: env_name.into(),
            reason: reason.into(),
        }
    }

    pub fn command_started(
        env_name: impl Into<String>,
        command_index: usize,
        command: impl Into<String>,
    ) -> Self {
        Self::CommandStarted {
            env_name: env_name.into(),
            command_index,
            command: command.into(),
        }
    }

    pub fn command_output(
        env_name: impl Into<String>,
        command_index: usize,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::CommandOutput {
            env_name: env_name.into(),
            command_index,
            output: output.into(),
            is_error,
        }
    }

    pub fn command_completed(
        env_name: impl Into<String>,
        command_index: usize,
        status: CommandStatus,
        duration: Duration,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandCompleted {
            env_name: env_name.into(),
            command_index,
            status,
            duration,
            exit_code,
        }
    }

    pub fn command_skipped(
        env_name: impl Into<String>,
        command_index: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::CommandSkipped {
            env_name: env_name.into(),
            command_index,
            reason: reason.into(),
        }
    }

    /// Create an info log event
    pub fn info(message: impl Into<String>, env_name: Option<String>) -> Self {
        Self::Log {
            level: LogLevel::Info,
            message: message.into(),
            env_name,
        }
    }

    /// Create a warning log event
    pub fn warning(message: impl Into<String>, env_name: Option<String>) -> Self {
        Self::Log {
            level: LogLevel::Warning,
            message: message.into(),
            env_name,
        }
    }

    /// Create an error log event
    pub fn error(message: impl Into<String>, env_name: Option<String>) -> Self {
        Self::Log {
            level: LogLevel::Error,
            message: message.into(),
            env_name,
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ExecutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ExecutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ExecutionEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}
