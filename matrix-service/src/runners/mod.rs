// Runners Module
// Executes individual command lines for the matrix executor

pub mod externals;
pub mod shell;

// Re-export key types
pub use externals::{check_external, program_of, ExternalCheck};
pub use shell::{ShellConfig, ShellOutput, ShellRunner};

use std::collections::HashMap;
use std::path::Path;

/// Callback for handling output lines in real-time (line, is_stderr)
pub type OutputCallback = Box<dyn Fn(&str, bool) + Send + Sync>;

/// Trait for command runners
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command line with the given variables and directory
    async fn run(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
        on_output: Option<OutputCallback>,
    ) -> ShellOutput;
}
