use crate::commands::{load_matrix, Source};
use crate::output;

use clap::Args;
use color_eyre::Result;

use matrix_service::{ExecutionPlan, MatrixExpander};

/// Show expanded execution plans
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Only these environments (comma separated or repeated)
    #[arg(short = 'e', long = "env", value_name = "ENV", value_delimiter = ',')]
    pub envs: Vec<String>,

    /// Print plans as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(source: Source<'_>, args: ShowArgs) -> Result<()> {
    let (_, matrix) = load_matrix(source, Vec::new())?;
    let plans = MatrixExpander::expand_selected(&matrix, &args.envs)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for plan in &plans {
        print_plan(plan);
    }

    Ok(())
}

fn print_plan(plan: &ExecutionPlan) {
    output::header(&format!("{} [{}]", plan.env_name, plan.index));
    println!("  config_dir: {}", plan.config_dir.display());
    println!("  usedevelop: {}", plan.usedevelop);

    if !plan.deps.is_empty() {
        println!("  deps:");
        for dep in &plan.deps {
            println!("    {}", dep);
        }
    }

    if !plan.setenv.is_empty() {
        println!("  setenv:");
        for (key, value) in &plan.setenv {
            println!("    {} = {}", key, value);
        }
    }

    if !plan.whitelist_externals.is_empty() {
        let externals: Vec<&str> = plan.whitelist_externals.iter().map(String::as_str).collect();
        println!("  whitelist_externals: {}", externals.join(" "));
    }

    println!("  commands:");
    for (i, command) in plan.commands.iter().enumerate() {
        println!("    {}. {}", i + 1, command);
    }
    println!();
}
