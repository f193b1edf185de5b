use crate::commands::{load_matrix, Source};
use crate::output;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::Result;

use matrix_service::{
    progress_channel, CommandStatus, ExecutionEvent, ExecutorConfig, MatrixExecutor,
    MatrixExpander, MatrixResult,
};

/// Run the matrix locally
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only these environments (comma separated or repeated)
    #[arg(short = 'e', long = "env", value_name = "ENV", value_delimiter = ',')]
    pub envs: Vec<String>,

    /// Environments to run at once (0 or 1 = one at a time)
    #[arg(short = 'p', long, value_name = "N", default_value_t = 0)]
    pub parallel: usize,

    /// Skip environments not yet started after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Fail commands whose program is not in whitelist_externals
    #[arg(long)]
    pub strict_externals: bool,

    /// Per-command timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Working directory for commands (default: the declaration's directory)
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Arguments substituted for {posargs}
    #[arg(last = true, value_name = "POSARGS")]
    pub posargs: Vec<String>,
}

impl RunArgs {
    fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_parallel: self.parallel,
            fail_fast: self.fail_fast,
            strict_externals: self.strict_externals,
            working_dir: self.working_dir.clone(),
            command_timeout: self.timeout.map(Duration::from_secs),
            ..ExecutorConfig::default()
        }
    }
}

pub async fn execute(source: Source<'_>, args: RunArgs) -> Result<()> {
    if let Some(dir) = &args.working_dir {
        if !dir.is_dir() {
            color_eyre::eyre::bail!("Working directory not found: {}", dir.display());
        }
    }

    let (path, matrix) = load_matrix(source, args.posargs.clone())?;
    let plans = MatrixExpander::expand_selected(&matrix, &args.envs)?;

    output::status("Running", &format!("{}", path.display()));

    let (tx, mut rx) = progress_channel();
    let executor = MatrixExecutor::new()
        .with_config(args.executor_config())
        .with_progress(tx);

    // Spawn execution in background
    let exec_handle = tokio::spawn(async move { executor.execute(plans).await });

    // Interleaved output is only readable when one environment runs at a time
    let show_output = args.parallel <= 1;
    while let Some(event) = rx.recv().await {
        print_event(&event, show_output);
    }

    let result = exec_handle.await?;
    print_summary(&result);

    if !result.success {
        std::process::exit(result.exit_code());
    }

    Ok(())
}

fn print_event(event: &ExecutionEvent, show_output: bool) {
    match event {
        ExecutionEvent::MatrixStarted { total_envs } => {
            println!();
            output::header(&format!("Matrix ({} environments)", total_envs));
        }

        ExecutionEvent::MatrixCompleted { success, duration } => {
            println!();
            if *success {
                output::success(&format!(
                    "All environments passed in {}",
                    output::seconds(*duration)
                ));
            } else {
                output::failure(&format!("Matrix failed after {}", output::seconds(*duration)));
            }
        }

        ExecutionEvent::EnvStarted {
            env_name,
            total_commands,
        } => {
            output::env_header(env_name, *total_commands);
        }

        ExecutionEvent::EnvDependencies {
            env_name,
            deps,
            usedevelop,
        } => {
            if !deps.is_empty() {
                output::dim(&format!("    {} deps: {}", env_name, deps.join(", ")));
            }
            if *usedevelop {
                output::dim(&format!("    {} usedevelop: true", env_name));
            }
        }

        ExecutionEvent::EnvCompleted {
            env_name,
            status,
            duration,
        } => output::env_completed(env_name, *status, *duration),

        ExecutionEvent::EnvSkipped { env_name, reason } => {
            output::warning(&format!("  {} skipped: {}", env_name, reason));
        }

        ExecutionEvent::CommandStarted {
            env_name,
            command_index,
            command,
        } => {
            output::command_line(env_name, *command_index, command);
        }

        ExecutionEvent::CommandOutput {
            env_name,
            output: line,
            is_error,
            ..
        } => {
            if !show_output {
                return;
            }
            if *is_error {
                output::command_error(env_name, line);
            } else {
                output::command_output(env_name, line);
            }
        }

        ExecutionEvent::CommandCompleted {
            status,
            duration,
            exit_code,
            ..
        } => {
            let exit_info = match exit_code {
                Some(code) if *code != 0 => format!(" (exit code: {})", code),
                _ => String::new(),
            };
            let message = format!("        {}{}", output::seconds(*duration), exit_info);
            if *status == CommandStatus::Succeeded {
                output::dim_success(&format!("{} OK", message));
            } else {
                output::dim_failure(&format!("{} FAIL", message));
            }
        }

        ExecutionEvent::CommandSkipped {
            env_name,
            command_index,
            reason,
        } => {
            output::warning(&format!(
                "    [{} {}] skipped: {}",
                env_name,
                command_index + 1,
                reason
            ));
        }

        ExecutionEvent::Log {
            level,
            message,
            env_name,
        } => output::log(*level, env_name.as_deref(), message),
    }
}

fn print_summary(result: &MatrixResult) {
    println!();
    output::header("Summary");
    for plan in &result.plans {
        output::summary_line(plan);
    }

    if let Some(failure) = result.first_failure() {
        println!();
        output::error(&failure.to_string());
    }
}
