// Matrix Declaration Models
// Immutable representation of a parsed environment matrix

use crate::parser::error::{ParseError, ParseErrorKind, ParseResult};
use crate::parser::substitution::{display_template, escape};
use crate::utils::process_env;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A validated environment matrix.
///
/// Fields are private: once built, a matrix is only ever read. Getters return
/// the values as a plan will see them, with escaped braces collapsed; only
/// `{envname}` is left in place because it differs per environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    config_dir: PathBuf,
    envlist: Vec<String>,
    deps: Vec<String>,
    setenv: BTreeMap<String, String>,
    commands: Vec<String>,
    whitelist_externals: BTreeSet<String>,
    usedevelop: bool,
    #[serde(skip)]
    templates: Templates,
}

/// Group values still carrying doubled braces, consumed by expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Templates {
    pub deps: Vec<String>,
    pub setenv: BTreeMap<String, String>,
    pub commands: Vec<String>,
    pub whitelist_externals: BTreeSet<String>,
}

impl Matrix {
    /// Directory containing the declaration
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Environment names in declared order
    pub fn envlist(&self) -> &[String] {
        &self.envlist
    }

    /// Shared dependencies, first occurrence order
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Shared variable assignments
    pub fn setenv(&self) -> &BTreeMap<String, String> {
        &self.setenv
    }

    /// Shared commands in execution order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Programs allowed to run from outside the environment
    pub fn whitelist_externals(&self) -> &BTreeSet<String> {
        &self.whitelist_externals
    }

    /// Whether the package under test is installed in development mode
    pub fn usedevelop(&self) -> bool {
        self.usedevelop
    }

    pub fn has_env(&self, name: &str) -> bool {
        self.envlist.iter().any(|e| e == name)
    }

    pub(crate) fn templates(&self) -> &Templates {
        &self.templates
    }
}

/// Builder for creating matrices programmatically.
///
/// `build` applies the same checks as the file parser, so a matrix can never
/// exist with duplicate environments or without commands.
///
/// `dep`, `set_var`, `command` and `whitelist` take literal text. The
/// `*_template` variants take text that may contain `{envname}` and doubled
/// braces, exactly as written in a declaration after parse-time tokens are
/// resolved.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    config_dir: PathBuf,
    envlist: Vec<String>,
    usedevelop: bool,
    templates: Templates,
}

impl MatrixBuilder {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Add an environment name
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.envlist.push(name.into());
        self
    }

    /// Add a dependency (duplicates are collapsed at build time)
    pub fn dep(self, dep: impl AsRef<str>) -> Self {
        self.dep_template(escape(dep.as_ref()))
    }

    pub fn dep_template(mut self, dep: impl Into<String>) -> Self {
        self.templates.deps.push(dep.into());
        self
    }

    /// Set a variable, replacing any previous value
    pub fn set_var(self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.var_template(key, escape(value.as_ref()))
    }

    pub fn var_template(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.templates.setenv.insert(key.into(), value.into());
        self
    }

    /// Append a command line
    pub fn command(self, command: impl AsRef<str>) -> Self {
        self.command_template(escape(command.as_ref()))
    }

    pub fn command_template(mut self, command: impl Into<String>) -> Self {
        self.templates.commands.push(command.into());
        self
    }

    /// Whitelist an external program
    pub fn whitelist(self, program: impl AsRef<str>) -> Self {
        self.whitelist_template(escape(program.as_ref()))
    }

    pub fn whitelist_template(mut self, program: impl Into<String>) -> Self {
        self.templates.whitelist_externals.insert(program.into());
        self
    }

    pub fn usedevelop(mut self, usedevelop: bool) -> Self {
        self.usedevelop = usedevelop;
        self
    }

    /// Validate and freeze into a `Matrix`
    pub fn build(self) -> ParseResult<Matrix> {
        if self.envlist.is_empty() {
            return Err(
                ParseError::unlocated("envlist is empty", ParseErrorKind::MissingField)
                    .with_suggestion("list at least one environment, e.g. 'envlist = py27,py34'"),
            );
        }

        let mut seen = BTreeSet::new();
        for name in &self.envlist {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::unlocated(
                    format!("duplicate environment '{}' in envlist", name),
                    ParseErrorKind::DuplicateEnvironment,
                ));
            }
        }

        if self.templates.commands.is_empty() {
            return Err(ParseError::unlocated(
                "no commands declared",
                ParseErrorKind::EmptyCommands,
            )
            .with_suggestion("add 'commands =' with one command per indented line"));
        }

        let mut templates = self.templates;
        let mut seen = BTreeSet::new();
        templates.deps.retain(|d| seen.insert(d.clone()));

        Ok(Matrix {
            config_dir: self.config_dir,
            envlist: self.envlist,
            deps: templates.deps.iter().map(|d| display_template(d)).collect(),
            setenv: templates
                .setenv
                .iter()
                .map(|(k, v)| (k.clone(), display_template(v)))
                .collect(),
            commands: templates.commands.iter().map(|c| display_template(c)).collect(),
            whitelist_externals: templates
                .whitelist_externals
                .iter()
                .map(|w| display_template(w))
                .collect(),
            usedevelop: self.usedevelop,
            templates,
        })
    }
}

/// Values available to `{token}` placeholders at parse time.
///
/// Passed explicitly so parsing never reads process state on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionContext {
    /// Value of `{toxinidir}`
    pub config_dir: PathBuf,
    /// Value of `{homedir}`
    pub home_dir: Option<PathBuf>,
    /// Value of `{posargs}`
    pub posargs: Vec<String>,
    /// Values for `{env:KEY}`
    pub env: BTreeMap<String, String>,
}

impl SubstitutionContext {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Snapshot the current process environment and home directory
    pub fn from_process(config_dir: impl Into<PathBuf>) -> Self {
        Self::new(config_dir)
            .with_home_dir(dirs::home_dir())
            .with_env(process_env())
    }

    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn with_posargs(mut self, posargs: Vec<String>) -> Self {
        self.posargs = posargs;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}
