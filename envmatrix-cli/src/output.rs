// Output formatting helpers for CLI commands
//
// Progress and diagnostics go to stderr; command output goes to stdout so it
// can be piped. Colour is dropped when NO_COLOR is set.

use matrix_service::execution::events::LogLevel;
use matrix_service::{EnvStatus, PlanResult};

use std::sync::OnceLock;
use std::time::Duration;

const BOLD: &str = "1";
const DIM: &str = "2";
const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const BLUE_BOLD: &str = "1;34";
const CYAN_BOLD: &str = "1;36";
const GREEN_BOLD: &str = "1;32";
const RED_BOLD: &str = "1;31";

fn color_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("NO_COLOR").is_none())
}

fn paint(code: &str, text: &str) -> String {
    if color_enabled() {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Print a status message: "  Validating path"
pub fn status(action: &str, message: &str) {
    eprintln!("{} {}", paint(CYAN_BOLD, &format!("{:>12}", action)), message);
}

/// Print a success message with checkmark
pub fn success(message: &str) {
    eprintln!("{} {}", paint(GREEN_BOLD, "  \u{2713}"), message);
}

/// Print a failure message with X
pub fn failure(message: &str) {
    eprintln!("{} {}", paint(RED_BOLD, "  \u{2717}"), message);
}

/// Print a check/pass item
pub fn check(message: &str) {
    eprintln!("{} {}", paint(GREEN, "  \u{2713}"), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", paint(YELLOW, "  !"), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", paint(RED_BOLD, "error:"), message);
}

/// Print a dim/muted message
pub fn dim(message: &str) {
    eprintln!("{}", paint(DIM, message));
}

/// Print a dim success message
pub fn dim_success(message: &str) {
    eprintln!("{}", paint(GREEN, message));
}

/// Print a dim failure message
pub fn dim_failure(message: &str) {
    eprintln!("{}", paint(RED, message));
}

/// Print a log event at its level
pub fn log(level: LogLevel, env_name: Option<&str>, message: &str) {
    let message = match env_name {
        Some(env) => format!("{}: {}", env, message),
        None => message.to_string(),
    };
    match level {
        LogLevel::Error => error(&message),
        LogLevel::Warning => warning(&message),
        LogLevel::Info => dim(&format!("  {}", message)),
    }
}

/// Print an environment header
pub fn env_header(name: &str, total_commands: usize) {
    eprintln!(
        "{} '{}' ({} {})",
        paint(BLUE_BOLD, "  Env"),
        name,
        total_commands,
        if total_commands == 1 { "command" } else { "commands" }
    );
}

/// Print the line announcing a command: "    [py27 2] flake8"
pub fn command_line(env_name: &str, index: usize, command: &str) {
    println!("    {} {}", command_tag(env_name, index), command);
}

/// Print command output, tagged with its environment
pub fn command_output(env_name: &str, line: &str) {
    println!("        {} | {}", env_name, line);
}

/// Print command error output (tagged, red)
pub fn command_error(env_name: &str, line: &str) {
    eprintln!("{}", paint(RED, &format!("        {} | {}", env_name, line)));
}

/// Print an environment's outcome in its status colour
pub fn env_completed(env_name: &str, status: EnvStatus, duration: Duration) {
    let message = format!("  {} {} ({})", env_name, status, seconds(duration));
    match status {
        EnvStatus::Succeeded => dim_success(&message),
        EnvStatus::Failed => dim_failure(&message),
        EnvStatus::Skipped => warning(&message),
    }
}

/// Print one row of the run summary
pub fn summary_line(plan: &PlanResult) {
    let line = summary_text(plan);
    match plan.status {
        EnvStatus::Succeeded => check(&line),
        EnvStatus::Failed => failure(&line),
        EnvStatus::Skipped => warning(&line),
    }
}

/// Print a header line
pub fn header(message: &str) {
    eprintln!("{}", paint(BOLD, &format!("==> {}", message)));
}

fn command_tag(env_name: &str, index: usize) -> String {
    format!("[{} {}]", env_name, index + 1)
}

/// Seconds with two decimals: "1.50s"
pub fn seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

fn summary_text(plan: &PlanResult) -> String {
    match (&plan.status, &plan.failure) {
        (EnvStatus::Failed, Some(failure)) => format!(
            "{}: failed at {} {} ({})",
            plan.env_name,
            command_tag(&plan.env_name, failure.command_index),
            failure.command,
            failure.reason
        ),
        (EnvStatus::Skipped, _) => format!("{}: skipped", plan.env_name),
        (status, _) => format!("{}: {} in {}", plan.env_name, status, seconds(plan.duration)),
    }
}
