use crate::commands::{load_matrix, Source};
use crate::output;

use color_eyre::Result;

pub fn execute(source: Source<'_>) -> Result<()> {
    let (path, matrix) = load_matrix(source, Vec::new())?;

    output::status("Validating", &format!("{}", path.display()));
    output::check(&format!(
        "Environments: {} ({})",
        matrix.envlist().len(),
        matrix.envlist().join(", ")
    ));
    output::check(&format!(
        "Structure: {} deps, {} variables, {} commands",
        matrix.deps().len(),
        matrix.setenv().len(),
        matrix.commands().len()
    ));
    if !matrix.whitelist_externals().is_empty() {
        let externals: Vec<&str> = matrix
            .whitelist_externals()
            .iter()
            .map(String::as_str)
            .collect();
        output::check(&format!("Externals: {}", externals.join(" ")));
    }

    println!();
    output::success("Declaration is valid");

    Ok(())
}
