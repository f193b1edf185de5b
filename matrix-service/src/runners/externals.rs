// External Program Checks
// Decides whether a command's program may run from outside the environment

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Result of checking a command's program against the whitelist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalCheck {
    /// Program is whitelisted
    Whitelisted,
    /// Program resolves on the search path but is not whitelisted
    NotWhitelisted(PathBuf),
    /// Program could not be resolved (shell builtin or missing)
    Unresolved,
    /// Command line is empty
    Empty,
}

/// First word of a command line, with surrounding quotes removed
pub fn program_of(command: &str) -> Option<&str> {
    command
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c| c == '"' || c == '\''))
        .filter(|word| !word.is_empty())
}

/// Check the program of `command`.
///
/// `search_path` is the PATH the command will see; `cwd` is used for
/// relative program paths.
pub fn check_external<'a, I>(
    command: &str,
    whitelist: I,
    search_path: Option<OsString>,
    cwd: &Path,
) -> ExternalCheck
where
    I: IntoIterator<Item = &'a String>,
{
    let Some(program) = program_of(command) else {
        return ExternalCheck::Empty;
    };

    if whitelist.into_iter().any(|w| w == program) {
        return ExternalCheck::Whitelisted;
    }

    match which::which_in(program, search_path, cwd) {
        Ok(path) => ExternalCheck::NotWhitelisted(path),
        Err(_) => ExternalCheck::Unresolved,
    }
}
