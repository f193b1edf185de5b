// Matrix Executor
// Runs expanded plans, one environment per task, with bounded parallelism

use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::execution::matrix::ExecutionPlan;
use crate::execution::results::{
    CommandFailure, CommandResult, CommandStatus, EnvStatus, MatrixResult, PlanResult,
};
use crate::runners::{check_external, CommandRunner, ExternalCheck, OutputCallback};
use crate::runners::{ShellConfig, ShellRunner};
use crate::utils::process_env;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Variable carrying the environment name into every command
pub const ENV_NAME_VAR: &str = "ENVMATRIX_ENV_NAME";

/// Configuration for matrix execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum environments running at once (0 or 1 = one at a time)
    pub max_parallel: usize,
    /// Skip environments not yet started once one has failed
    pub fail_fast: bool,
    /// Fail commands whose program is not whitelisted
    pub strict_externals: bool,
    /// Working directory for commands (None = the declaration's directory)
    pub working_dir: Option<PathBuf>,
    /// Timeout per command
    pub command_timeout: Option<Duration>,
    /// Start from the process environment before applying `setenv`
    pub inherit_env: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            fail_fast: false,
            strict_externals: false,
            working_dir: None,
            command_timeout: None,
            inherit_env: true,
        }
    }
}

/// Matrix executor
pub struct MatrixExecutor {
    /// Configuration
    config: ExecutorConfig,
    /// Progress event sender
    event_tx: Option<ProgressSender>,
    /// Runner override; a `ShellRunner` is built from the config otherwise
    runner: Option<Arc<dyn CommandRunner>>,
}

impl MatrixExecutor {
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
            event_tx: None,
            runner: None,
        }
    }

    /// Set executor configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run commands through `runner` instead of the shell
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute plans; results come back in the order the plans were given
    pub async fn execute(&self, plans: Vec<ExecutionPlan>) -> MatrixResult {
        let start = Instant::now();

        self.event_tx
            .send_event(ExecutionEvent::matrix_started(plans.len()));
        info!(
            envs = plans.len(),
            max_parallel = self.config.max_parallel,
            "running matrix"
        );

        let worker = Arc::new(PlanWorker {
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            runner: self.runner.clone().unwrap_or_else(|| self.shell_runner()),
            cancelled: AtomicBool::new(false),
        });

        let plan_results = if self.config.max_parallel <= 1 || plans.len() <= 1 {
            let mut results = Vec::with_capacity(plans.len());
            for plan in plans {
                results.push(worker.run_plan(plan).await);
            }
            results
        } else {
            Self::execute_parallel(worker, plans, self.config.max_parallel).await
        };

        let success = plan_results.iter().all(PlanResult::succeeded);
        let duration = start.elapsed();

        self.event_tx
            .send_event(ExecutionEvent::matrix_completed(success, duration));
        info!(success, ?duration, "matrix finished");

        MatrixResult {
            plans: plan_results,
            duration,
            success,
        }
    }

    async fn execute_parallel(
        worker: Arc<PlanWorker>,
        plans: Vec<ExecutionPlan>,
        max_parallel: usize,
    ) -> Vec<PlanResult> {
        let semaphore = Arc::new(Semaphore::new(max_parallel));

        let handles: Vec<_> = plans
            .into_iter()
            .map(|plan| {
                let worker = Arc::clone(&worker);
                let semaphore = Arc::clone(&semaphore);
                let env_name = plan.env_name.clone();
                let handle = tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return PlanResult::skipped(&plan.env_name);
                    };
                    worker.run_plan(plan).await
                });
                (env_name, handle)
            })
            .collect();

        // Awaiting in spawn order keeps results in declared order
        let mut results = Vec::with_capacity(handles.len());
        for (env_name, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(env = %env_name, error = %e, "environment task aborted");
                    results.push(PlanResult {
                        failure: Some(CommandFailure {
                            env_name: env_name.clone(),
                            command_index: 0,
                            command: String::new(),
                            exit_code: None,
                            reason: format!("task aborted: {}", e),
                        }),
                        env_name,
                        status: EnvStatus::Failed,
                        commands: Vec::new(),
                        duration: Duration::ZERO,
                    });
                }
            }
        }
        results
    }

    fn shell_runner(&self) -> Arc<dyn CommandRunner> {
        Arc::new(ShellRunner::new().with_config(ShellConfig {
            timeout: self.config.command_timeout,
            clear_env: !self.config.inherit_env,
        }))
    }
}

impl Default for MatrixExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every plan of one `execute` call
struct PlanWorker {
    config: ExecutorConfig,
    event_tx: Option<ProgressSender>,
    runner: Arc<dyn CommandRunner>,
    /// Set when a plan fails and `fail_fast` is on
    cancelled: AtomicBool,
}

impl PlanWorker {
    async fn run_plan(&self, plan: ExecutionPlan) -> PlanResult {
        if self.config.fail_fast && self.cancelled.load(Ordering::SeqCst) {
            info!(env = %plan.env_name, "skipping environment after earlier failure");
            self.event_tx.send_event(ExecutionEvent::env_skipped(
                &plan.env_name,
                "an earlier environment failed",
            ));
            return PlanResult::skipped(&plan.env_name);
        }

        let start = Instant::now();
        self.event_tx.send_event(ExecutionEvent::env_started(
            &plan.env_name,
            plan.commands.len(),
        ));
        info!(env = %plan.env_name, commands = plan.commands.len(), "starting environment");

        self.report_dependencies(&plan);

        let env = self.plan_environment(&plan);
        let working_dir = self
            .config
            .working_dir
            .clone()
            .unwrap_or_else(|| plan.config_dir.clone());

        let mut commands = Vec::with_capacity(plan.commands.len());
        let mut failure: Option<CommandFailure> = None;

        for (index, command) in plan.commands.iter().enumerate() {
            if failure.is_some() {
                self.event_tx.send_event(ExecutionEvent::command_skipped(
                    &plan.env_name,
                    index,
                    "an earlier command failed",
                ));
                commands.push(CommandResult::skipped(index, command));
                continue;
            }

            let (result, command_failure) = self
                .run_command(&plan, index, command, &env, &working_dir)
                .await;
            commands.push(result);
            failure = command_failure;
        }

        let status = if failure.is_some() {
            EnvStatus::Failed
        } else {
            EnvStatus::Succeeded
        };

        if let Some(failure) = &failure {
            warn!(env = %plan.env_name, "{}", failure);
            if self.config.fail_fast && !self.cancelled.swap(true, Ordering::SeqCst) {
                self.event_tx.send_event(ExecutionEvent::info(
                    "fail-fast: environments not yet started will be skipped",
                    Some(plan.env_name.clone()),
                ));
            }
        }

        let duration = start.elapsed();
        self.event_tx
            .send_event(ExecutionEvent::env_completed(&plan.env_name, status, duration));
        info!(env = %plan.env_name, %status, ?duration, "environment finished");

        PlanResult {
            env_name: plan.env_name,
            status,
            commands,
            duration,
            failure,
        }
    }

    async fn run_command(
        &self,
        plan: &ExecutionPlan,
        index: usize,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> (CommandResult, Option<CommandFailure>) {
        let start = Instant::now();
        self.event_tx
            .send_event(ExecutionEvent::command_started(&plan.env_name, index, command));
        debug!(env = %plan.env_name, index, command, "running command");

        if let Err(reason) = self.check_external(plan, command, env, working_dir) {
            return self.finish_command(plan, index, command, start, None, String::new(), reason);
        }

        let on_output: Option<OutputCallback> = self.event_tx.clone().map(|tx| {
            let env_name = plan.env_name.clone();
            Box::new(move |line: &str, is_error: bool| {
                tx.send_event(ExecutionEvent::command_output(
                    env_name.as_str(),
                    index,
                    line,
                    is_error,
                ));
            }) as OutputCallback
        });

        let output = self.runner.run(command, env, working_dir, on_output).await;

        if output.success() {
            let duration = start.elapsed();
            self.event_tx.send_event(ExecutionEvent::command_completed(
                &plan.env_name,
                index,
                CommandStatus::Succeeded,
                duration,
                output.exit_code,
            ));
            let result = CommandResult {
                index,
                command: command.to_string(),
                status: CommandStatus::Succeeded,
                exit_code: output.exit_code,
                duration,
                stdout: output.stdout,
                stderr: output.stderr,
            };
            return (result, None);
        }

        let reason = if output.timed_out {
            "timed out".to_string()
        } else if let Some(code) = output.exit_code {
            format!("exit code {}", code)
        } else if !output.stderr.is_empty() {
            output.stderr.clone()
        } else {
            "terminated by signal".to_string()
        };

        let mut failed = self.finish_command(
            plan,
            index,
            command,
            start,
            output.exit_code,
            output.stderr,
            reason,
        );
        failed.0.stdout = output.stdout;
        failed
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_command(
        &self,
        plan: &ExecutionPlan,
        index: usize,
        command: &str,
        start: Instant,
        exit_code: Option<i32>,
        stderr: String,
        reason: String,
    ) -> (CommandResult, Option<CommandFailure>) {
        let duration = start.elapsed();
        self.event_tx.send_event(ExecutionEvent::command_completed(
            &plan.env_name,
            index,
            CommandStatus::Failed,
            duration,
            exit_code,
        ));

        let result = CommandResult {
            index,
            command: command.to_string(),
            status: CommandStatus::Failed,
            exit_code,
            duration,
            stdout: String::new(),
            stderr,
        };
        let failure = CommandFailure {
            env_name: plan.env_name.clone(),
            command_index: index,
            command: command.to_string(),
            exit_code,
            reason,
        };
        (result, Some(failure))
    }

    /// Warn about (or, when strict, refuse) programs outside the whitelist
    fn check_external(
        &self,
        plan: &ExecutionPlan,
        command: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> Result<(), String> {
        let search_path = env.get("PATH").map(OsString::from);

        if let ExternalCheck::NotWhitelisted(path) =
            check_external(command, &plan.whitelist_externals, search_path, working_dir)
        {
            let message = format!(
                "{} is not allowed: add it to whitelist_externals",
                path.display()
            );
            warn!(env = %plan.env_name, program = %path.display(), "program is not whitelisted");
            let env_name = Some(plan.env_name.clone());
            if self.config.strict_externals {
                self.event_tx
                    .send_event(ExecutionEvent::error(&message, env_name));
                return Err(message);
            }
            self.event_tx
                .send_event(ExecutionEvent::warning(&message, env_name));
        }
        Ok(())
    }

    fn report_dependencies(&self, plan: &ExecutionPlan) {
        if plan.deps.is_empty() && !plan.usedevelop {
            return;
        }
        info!(
            env = %plan.env_name,
            deps = ?plan.deps,
            usedevelop = plan.usedevelop,
            "dependencies are expected to be installed externally"
        );
        self.event_tx.send_event(ExecutionEvent::EnvDependencies {
            env_name: plan.env_name.clone(),
            deps: plan.deps.clone(),
            usedevelop: plan.usedevelop,
        });
    }

    fn plan_environment(&self, plan: &ExecutionPlan) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = if self.config.inherit_env {
            process_env()
        } else {
            HashMap::new()
        };
        env.extend(
            plan.setenv
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        env.insert(ENV_NAME_VAR.to_string(), plan.env_name.clone());
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::{progress_channel, LogLevel};
    use crate::runners::ShellOutput;

    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    /// Records every call; commands starting with "fail" exit with 1
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, HashMap<String, String>, PathBuf)>>,
    }

    impl RecordingRunner {
        fn commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(c, _, _)| c.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(
            &self,
            command: &str,
            env: &HashMap<String, String>,
            working_dir: &Path,
            on_output: Option<OutputCallback>,
        ) -> ShellOutput {
            self.calls.lock().unwrap().push((
                command.to_string(),
                env.clone(),
                working_dir.to_path_buf(),
            ));
            if let Some(callback) = on_output {
                callback(command, false);
            }
            ShellOutput {
                stdout: command.to_string(),
                stderr: String::new(),
                exit_code: Some(if command.starts_with("fail") { 1 } else { 0 }),
                timed_out: false,
            }
        }
    }

    fn plan(name: &str, index: usize, commands: &[&str]) -> ExecutionPlan {
        ExecutionPlan {
            env_name: name.to_string(),
            index,
            config_dir: std::env::temp_dir(),
            deps: Vec::new(),
            setenv: BTreeMap::new(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            whitelist_externals: BTreeSet::new(),
            usedevelop: false,
        }
    }

    fn executor(runner: &Arc<RecordingRunner>, config: ExecutorConfig) -> MatrixExecutor {
        MatrixExecutor::new()
            .with_config(config)
            .with_runner(runner.clone() as Arc<dyn CommandRunner>)
    }

    #[tokio::test]
    async fn test_all_plans_succeed() {
        let runner = Arc::new(RecordingRunner::default());
        let result = executor(&runner, ExecutorConfig::default())
            .execute(vec![plan("py27", 0, &["step-a", "step-b"]), plan("py34", 1, &["step-c"])])
            .await;

        assert!(result.success);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(runner.commands(), vec!["step-a", "step-b", "step-c"]);
        assert_eq!(result.plans[0].commands.len(), 2);
        assert_eq!(result.plans[0].commands[1].stdout, "step-b");
    }

    #[tokio::test]
    async fn test_failure_stops_only_its_plan() {
        let runner = Arc::new(RecordingRunner::default());
        let result = executor(&runner, ExecutorConfig::default())
            .execute(vec![
                plan("py27", 0, &["fail-now", "never-run"]),
                plan("py34", 1, &["still-runs"]),
            ])
            .await;

        assert!(!result.success);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(runner.commands(), vec!["fail-now", "still-runs"]);

        let failed = &result.plans[0];
        assert_eq!(failed.status, EnvStatus::Failed);
        assert_eq!(failed.commands[1].status, CommandStatus::Skipped);
        let failure = failed.failure.as_ref().unwrap();
        assert_eq!(failure.env_name, "py27");
        assert_eq!(failure.command_index, 0);
        assert_eq!(failure.command, "fail-now");
        assert_eq!(failure.exit_code, Some(1));
        assert_eq!(failure.reason, "exit code 1");

        assert_eq!(result.plans[1].status, EnvStatus::Succeeded);
        assert_eq!(result.first_failure(), Some(failure));
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_plans() {
        let runner = Arc::new(RecordingRunner::default());
        let config = ExecutorConfig {
            fail_fast: true,
            ..ExecutorConfig::default()
        };
        let result = executor(&runner, config)
            .execute(vec![plan("a", 0, &["fail"]), plan("b", 1, &["ok"])])
            .await;

        assert_eq!(result.plans[0].status, EnvStatus::Failed);
        assert_eq!(result.plans[1].status, EnvStatus::Skipped);
        assert_eq!(runner.commands(), vec!["fail"]);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_fail_fast_is_announced_once() {
        let runner = Arc::new(RecordingRunner::default());
        let (tx, mut rx) = progress_channel();
        let config = ExecutorConfig {
            fail_fast: true,
            max_parallel: 2,
            ..ExecutorConfig::default()
        };
        executor(&runner, config)
            .with_progress(tx)
            .execute(vec![plan("a", 0, &["fail"]), plan("b", 1, &["fail"])])
            .await;

        let mut notices = 0;
        while let Ok(event) = rx.try_recv() {
            if let ExecutionEvent::Log { level: LogLevel::Info, message, .. } = event {
                assert!(message.contains("fail-fast"));
                notices += 1;
            }
        }
        assert_eq!(notices, 1);
    }

    #[tokio::test]
    async fn test_plan_environment_and_working_dir() {
        let runner = Arc::new(RecordingRunner::default());
        let workdir = tempfile::tempdir().unwrap();
        let config = ExecutorConfig {
            working_dir: Some(workdir.path().to_path_buf()),
            inherit_env: false,
            ..ExecutorConfig::default()
        };

        let mut py27 = plan("py27", 0, &["run"]);
        py27.setenv.insert("PYTHONHASHSEED".to_string(), "0".to_string());

        executor(&runner, config).execute(vec![py27]).await;

        let calls = runner.calls.lock().unwrap();
        let (_, env, dir) = &calls[0];
        assert_eq!(env.get("PYTHONHASHSEED").map(String::as_str), Some("0"));
        assert_eq!(env.get(ENV_NAME_VAR).map(String::as_str), Some("py27"));
        assert_eq!(env.len(), 2);
        assert_eq!(dir, workdir.path());
    }

    #[tokio::test]
    async fn test_working_dir_defaults_to_config_dir() {
        let runner = Arc::new(RecordingRunner::default());
        let mut p = plan("a", 0, &["run"]);
        p.config_dir = PathBuf::from("/some/project");

        executor(&runner, ExecutorConfig::default()).execute(vec![p]).await;

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].2, PathBuf::from("/some/project"));
    }

    #[tokio::test]
    async fn test_parallel_results_in_declared_order() {
        let runner = Arc::new(RecordingRunner::default());
        let config = ExecutorConfig {
            max_parallel: 4,
            ..ExecutorConfig::default()
        };
        let plans = (0..6)
            .map(|i| plan(&format!("env{}", i), i, &["ok"]))
            .collect();

        let result = executor(&runner, config).execute(plans).await;

        let names: Vec<_> = result.plans.iter().map(|p| p.env_name.as_str()).collect();
        assert_eq!(names, vec!["env0", "env1", "env2", "env3", "env4", "env5"]);
        assert!(result.success);
        assert_eq!(runner.commands().len(), 6);
    }

    #[tokio::test]
    async fn test_events_are_reported() {
        let runner = Arc::new(RecordingRunner::default());
        let (tx, mut rx) = progress_channel();
        let mut p = plan("py27", 0, &["ok", "fail", "skipped"]);
        p.deps.push("pytest".to_string());

        executor(&runner, ExecutorConfig::default())
            .with_progress(tx)
            .execute(vec![p])
            .await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(ExecutionEvent::MatrixStarted { total_envs: 1 })));
        assert!(matches!(
            events.last(),
            Some(ExecutionEvent::MatrixCompleted { success: false, .. })
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            ExecutionEvent::EnvDependencies { deps, .. } if deps == &vec!["pytest".to_string()]
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ExecutionEvent::CommandOutput { output, .. } if output == "ok"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ExecutionEvent::CommandSkipped { command_index: 2, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ExecutionEvent::EnvCompleted { status: EnvStatus::Failed, .. }
        )));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_strict_externals_refuses_unlisted_program() {
        let runner = Arc::new(RecordingRunner::default());
        let config = ExecutorConfig {
            strict_externals: true,
            ..ExecutorConfig::default()
        };

        let result = executor(&runner, config)
            .execute(vec![plan("a", 0, &["sh -c true"])])
            .await;

        assert!(runner.commands().is_empty());
        let failure = result.plans[0].failure.as_ref().unwrap();
        assert!(failure.reason.contains("whitelist_externals"));
        assert_eq!(failure.exit_code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unlisted_program_severity_follows_strictness() {
        for (strict, expected) in [(false, LogLevel::Warning), (true, LogLevel::Error)] {
            let runner = Arc::new(RecordingRunner::default());
            let (tx, mut rx) = progress_channel();
            let config = ExecutorConfig {
                strict_externals: strict,
                ..ExecutorConfig::default()
            };
            executor(&runner, config)
                .with_progress(tx)
                .execute(vec![plan("a", 0, &["sh -c true"])])
                .await;

            let mut levels = Vec::new();
            while let Ok(event) = rx.try_recv() {
                if let ExecutionEvent::Log { level, env_name, .. } = event {
                    assert_eq!(env_name.as_deref(), Some("a"));
                    levels.push(level);
                }
            }
            assert_eq!(levels, vec![expected]);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_strict_externals_allows_whitelisted_program() {
        let runner = Arc::new(RecordingRunner::default());
        let config = ExecutorConfig {
            strict_externals: true,
            ..ExecutorConfig::default()
        };
        let mut p = plan("a", 0, &["sh -c true"]);
        p.whitelist_externals.insert("sh".to_string());

        let result = executor(&runner, config).execute(vec![p]).await;

        assert!(result.success);
        assert_eq!(runner.commands(), vec!["sh -c true"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unlisted_program_only_warns_by_default() {
        let runner = Arc::new(RecordingRunner::default());
        let result = executor(&runner, ExecutorConfig::default())
            .execute(vec![plan("a", 0, &["sh -c true"])])
            .await;

        assert!(result.success);
        assert_eq!(runner.commands(), vec!["sh -c true"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_commands_see_variables() {
        let workdir = tempfile::tempdir().unwrap();
        let mut p = plan("py27", 0, &["test \"$GREETING\" = hello && test \"$ENVMATRIX_ENV_NAME\" = py27"]);
        p.config_dir = workdir.path().to_path_buf();
        p.setenv.insert("GREETING".to_string(), "hello".to_string());

        let result = MatrixExecutor::new().execute(vec![p]).await;

        assert!(result.success, "{:?}", result.first_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_failure_is_recorded() {
        let workdir = tempfile::tempdir().unwrap();
        let mut p = plan("py34", 0, &["exit 3", "echo unreachable"]);
        p.config_dir = workdir.path().to_path_buf();

        let result = MatrixExecutor::new().execute(vec![p]).await;

        let failure = result.first_failure().unwrap();
        assert_eq!(failure.exit_code, Some(3));
        assert_eq!(failure.command_index, 0);
        assert_eq!(result.plans[0].commands[1].status, CommandStatus::Skipped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_timeout() {
        let workdir = tempfile::tempdir().unwrap();
        let mut p = plan("slow", 0, &["exec sleep 5"]);
        p.config_dir = workdir.path().to_path_buf();
        let config = ExecutorConfig {
            command_timeout: Some(Duration::from_millis(200)),
            ..ExecutorConfig::default()
        };

        let result = MatrixExecutor::new().with_config(config).execute(vec![p]).await;

        let failure = result.first_failure().unwrap();
        assert_eq!(failure.reason, "timed out");
    }
}
