// Matrix Expansion
// Expands a parsed matrix into one independent execution plan per environment

use crate::error::{ServiceError, ServiceResult};
use crate::parser::models::Matrix;
use crate::parser::substitution::render_for_env;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// Fully expanded execution unit for one environment.
///
/// A plan owns all of its data; nothing is shared with the matrix or with
/// sibling plans, so plans can be moved to separate tasks and mutated freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Environment name
    pub env_name: String,
    /// Position in the declared envlist
    pub index: usize,
    /// Directory containing the declaration
    pub config_dir: PathBuf,
    /// Dependencies to install
    pub deps: Vec<String>,
    /// Variables injected before running commands
    pub setenv: BTreeMap<String, String>,
    /// Commands in execution order
    pub commands: Vec<String>,
    /// Programs allowed to run from outside the environment
    pub whitelist_externals: BTreeSet<String>,
    /// Install the package under test in development mode
    pub usedevelop: bool,
}

impl ExecutionPlan {
    /// Whether `program` is whitelisted for this plan
    pub fn allows_external(&self, program: &str) -> bool {
        self.whitelist_externals.contains(program)
    }
}

/// Matrix expander
pub struct MatrixExpander;

impl MatrixExpander {
    /// Expand every environment, in declared order
    pub fn expand(matrix: &Matrix) -> Vec<ExecutionPlan> {
        let plans: Vec<ExecutionPlan> = matrix
            .envlist()
            .iter()
            .enumerate()
            .map(|(index, name)| Self::plan_for(matrix, index, name))
            .collect();

        debug!(plans = plans.len(), "expanded matrix");
        plans
    }

    /// Expand only the named environments, keeping declared order.
    ///
    /// An empty selection expands everything.
    pub fn expand_selected(
        matrix: &Matrix,
        selected: &[String],
    ) -> ServiceResult<Vec<ExecutionPlan>> {
        if selected.is_empty() {
            return Ok(Self::expand(matrix));
        }

        if let Some(unknown) = selected.iter().find(|name| !matrix.has_env(name)) {
            return Err(ServiceError::UnknownEnvironment {
                name: unknown.clone(),
                available: matrix.envlist().to_vec(),
            });
        }

        Ok(matrix
            .envlist()
            .iter()
            .enumerate()
            .filter(|(_, name)| selected.contains(*name))
            .map(|(index, name)| Self::plan_for(matrix, index, name))
            .collect())
    }

    fn plan_for(matrix: &Matrix, index: usize, name: &str) -> ExecutionPlan {
        let templates = matrix.templates();
        ExecutionPlan {
            env_name: name.to_string(),
            index,
            config_dir: matrix.config_dir().to_path_buf(),
            deps: templates
                .deps
                .iter()
                .map(|d| render_for_env(d, name))
                .collect(),
            setenv: templates
                .setenv
                .iter()
                .map(|(k, v)| (k.clone(), render_for_env(v, name)))
                .collect(),
            commands: templates
                .commands
                .iter()
                .map(|c| render_for_env(c, name))
                .collect(),
            whitelist_externals: templates
                .whitelist_externals
                .iter()
                .map(|w| render_for_env(w, name))
                .collect(),
            usedevelop: matrix.usedevelop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MatrixBuilder, MatrixParser, SubstitutionContext};

    fn parse(source: &str) -> Matrix {
        MatrixParser::parse(source, &SubstitutionContext::new("/src")).unwrap()
    }

    #[test]
    fn test_one_plan_per_env_in_order() {
        let matrix = parse("[tox]\nenvlist = a,b\n[testenv]\ncommands = echo hi\n");
        let plans = MatrixExpander::expand(&matrix);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].env_name, "a");
        assert_eq!(plans[0].commands, ["echo hi"]);
        assert_eq!(plans[1].env_name, "b");
        assert_eq!(plans[1].commands, ["echo hi"]);
        assert_eq!(plans[1].index, 1);
    }

    #[test]
    fn test_plans_match_shared_declaration() {
        let matrix = MatrixBuilder::new("/src")
            .env("py27")
            .env("py34")
            .dep("pytest")
            .dep("tox-{plugin}")
            .set_var("PYTHONPATH", "/src/test")
            .set_var("FMT", "{{x}}")
            .command("py.test")
            .command("flake8")
            .command("echo }}")
            .command("awk '{print $1}' {envname}")
            .whitelist("make")
            .usedevelop(true)
            .build()
            .unwrap();

        for plan in MatrixExpander::expand(&matrix) {
            assert_eq!(plan.deps, matrix.deps());
            assert_eq!(&plan.setenv, matrix.setenv());
            assert_eq!(plan.commands, matrix.commands());
            assert_eq!(&plan.whitelist_externals, matrix.whitelist_externals());
            assert!(plan.usedevelop);
            assert!(plan.allows_external("make"));
        }

        let plans = MatrixExpander::expand(&matrix);
        assert_eq!(plans[0].commands[2], "echo }}");
        assert_eq!(plans[1].commands[3], "awk '{print $1}' {envname}");
        assert_eq!(plans[0].setenv["FMT"], "{{x}}");
        assert_eq!(plans[0].deps[1], "tox-{plugin}");
    }

    #[test]
    fn test_parsed_values_match_plans() {
        let matrix = parse(
            "[tox]\nenvlist = a{{1}}\n[testenv]\ndeps = x{{y}}\ncommands =\n    echo {{x}}\n    awk '{{print}}' }}\n",
        );
        let plans = MatrixExpander::expand(&matrix);

        assert_eq!(plans[0].env_name, "a{1}");
        assert_eq!(plans[0].commands, matrix.commands());
        assert_eq!(plans[0].commands, ["echo {x}", "awk '{print}' }"]);
        assert_eq!(plans[0].deps, matrix.deps());
    }

    #[test]
    fn test_plans_are_independent_copies() {
        let matrix = parse("[tox]\nenvlist = a,b\n[testenv]\ncommands = echo hi\n");
        let mut plans = MatrixExpander::expand(&matrix);

        plans[0].commands.push("rm -rf build".to_string());
        plans[0].setenv.insert("X".to_string(), "1".to_string());

        assert_eq!(plans[1].commands, ["echo hi"]);
        assert!(plans[1].setenv.is_empty());
        assert_eq!(matrix.commands(), ["echo hi"]);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let source = "[tox]\nenvlist = py26,py27\n[testenv]\ndeps = pytest\ncommands = py.test\n";
        assert_eq!(
            MatrixExpander::expand(&parse(source)),
            MatrixExpander::expand(&parse(source))
        );
    }

    #[test]
    fn test_envname_resolved_per_plan() {
        let matrix = parse(
            "[tox]\nenvlist = py27,py34\n[testenv]\nsetenv =\n    OUT = {toxinidir}/out/{envname}\ncommands = echo {envname}\n",
        );
        let plans = MatrixExpander::expand(&matrix);

        assert_eq!(plans[0].commands, ["echo py27"]);
        assert_eq!(plans[1].commands, ["echo py34"]);
        assert_eq!(plans[0].setenv["OUT"], "/src/out/py27");
        assert_eq!(plans[1].setenv["OUT"], "/src/out/py34");
    }

    #[test]
    fn test_escaped_braces_unescaped_in_plans() {
        let matrix = parse("[tox]\nenvlist = a\n[testenv]\ncommands = awk '{{print}}'\n");
        let plans = MatrixExpander::expand(&matrix);
        assert_eq!(plans[0].commands, ["awk '{print}'"]);
    }

    #[test]
    fn test_expand_selected_keeps_declared_order() {
        let matrix = parse("[tox]\nenvlist = a,b,c\n[testenv]\ncommands = true\n");
        let plans =
            MatrixExpander::expand_selected(&matrix, &["c".to_string(), "a".to_string()]).unwrap();

        let names: Vec<_> = plans.iter().map(|p| p.env_name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(plans[1].index, 2);
    }

    #[test]
    fn test_expand_selected_unknown_env() {
        let matrix = parse("[tox]\nenvlist = a\n[testenv]\ncommands = true\n");
        let err = MatrixExpander::expand_selected(&matrix, &["zz".to_string()]).unwrap_err();
        assert!(matches!(err, ServiceError::UnknownEnvironment { ref name, .. } if name == "zz"));
    }

    #[test]
    fn test_expand_selected_empty_means_all() {
        let matrix = parse("[tox]\nenvlist = a,b\n[testenv]\ncommands = true\n");
        assert_eq!(MatrixExpander::expand_selected(&matrix, &[]).unwrap().len(), 2);
    }
}
