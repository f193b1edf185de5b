// Matrix Service Library
// Core service for test-matrix declaration parsing, expansion and execution

pub mod error;
pub mod execution;
pub mod parser;
pub mod runners;
pub mod utils;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};

// Re-export parser types
pub use parser::{
    config_dir_of, IniDocument, Matrix, MatrixBuilder, MatrixParser, ParseError, ParseErrorKind,
    ParseResult, ParserOptions, SubstitutionContext,
};

// Re-export execution types
pub use execution::{
    progress_channel, CommandFailure, CommandResult, CommandStatus, EnvStatus, ExecutionEvent,
    ExecutionPlan, ExecutorConfig, MatrixExecutor, MatrixExpander, MatrixResult, PlanResult,
    ProgressReceiver, ProgressSender,
};

// Re-export runner types
pub use runners::{CommandRunner, ShellOutput, ShellRunner};

// Re-export utilities
pub use utils::{find_config, resolve_config};

/// Parse a declaration held in memory, resolving against `ctx`
pub fn parse(content: &str, ctx: &SubstitutionContext) -> ParseResult<Matrix> {
    MatrixParser::parse(content, ctx)
}

/// Expand every environment of `matrix` into an independent plan
pub fn expand(matrix: &Matrix) -> Vec<ExecutionPlan> {
    MatrixExpander::expand(matrix)
}
