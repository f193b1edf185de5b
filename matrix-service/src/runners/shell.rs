// Shell Runner
// Executes one command line in a shell with injected variables

use crate::runners::{CommandRunner, OutputCallback};

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Shell executable and the flag that makes it run one command line
fn shell_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "windows") {
        ("cmd", &["/C"])
    } else {
        ("sh", &["-c"])
    }
}

/// How long output readers may keep draining after a timed out process is killed
const READER_GRACE: Duration = Duration::from_millis(100);

/// Configuration for shell execution
#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    /// Timeout per command (None = no timeout)
    pub timeout: Option<Duration>,
    /// Start from an empty environment instead of inheriting the process one
    pub clear_env: bool,
}

/// Output collected during command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (None when the process could not run or was killed)
    pub exit_code: Option<i32>,
    /// Whether the timeout expired
    pub timed_out: bool,
}

impl ShellOutput {
    /// Output for a command that never produced an exit status
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stderr: message.into(),
            ..Self::default()
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Shell runner for executing command lines (`sh -c`, or `cmd /C` on Windows)
pub struct ShellRunner {
    config: ShellConfig,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            config: ShellConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute a command and collect its output
    pub async fn run_command(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> ShellOutput {
        self.run_streaming(command, env, working_dir, None).await
    }

    /// Execute a command, forwarding each output line to `on_output` as it arrives
    pub async fn run_streaming(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
        on_output: Option<OutputCallback>,
    ) -> ShellOutput {
        let (shell_cmd, shell_args) = shell_command();

        let mut cmd = Command::new(shell_cmd);
        cmd.args(shell_args);
        cmd.arg(command);
        cmd.current_dir(working_dir);
        if self.config.clear_env {
            cmd.env_clear();
        }
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        // Own process group, so a timeout also reaches anything the shell forked
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ShellOutput::failure(format!(
                    "Failed to spawn shell process '{}': {}",
                    shell_cmd, e
                ));
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            return ShellOutput::failure("Failed to capture process output");
        };

        let on_output = on_output.map(Arc::new);
        let stdout_handle = collect_lines(stdout, on_output.clone(), false);
        let stderr_handle = collect_lines(stderr, on_output, true);

        // Wait for completion with optional timeout
        let wait_result = if let Some(timeout) = self.config.timeout {
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    kill_tree(&mut child).await;
                    stderr_handle.abort();
                    return ShellOutput {
                        stdout: join_reader(stdout_handle).await,
                        stderr: format!("Process timed out after {:?}", timeout),
                        exit_code: None,
                        timed_out: true,
                    };
                }
            }
        } else {
            child.wait().await
        };

        let exit_code = wait_result.ok().and_then(|s| s.code());
        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        ShellOutput {
            stdout,
            stderr,
            exit_code,
            timed_out: false,
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
        on_output: Option<OutputCallback>,
    ) -> ShellOutput {
        self.run_streaming(command, env, working_dir, on_output)
            .await
    }
}

/// Kill the shell and its process group, then reap the shell
async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
    let _ = child.kill().await;
}

/// Collect what a reader gathered, giving up once `READER_GRACE` has passed.
///
/// A descendant that escaped the kill can hold the pipe open indefinitely.
async fn join_reader(mut handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(READER_GRACE, &mut handle).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

/// Read a stream line by line on its own task, joining lines with '\n'
fn collect_lines<R>(
    reader: R,
    on_output: Option<Arc<OutputCallback>>,
    is_error: bool,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut output = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(callback) = &on_output {
                callback(&line, is_error);
            }
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&line);
        }
        output
    })
}
