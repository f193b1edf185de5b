use crate::commands::{load_matrix, Source};

use color_eyre::Result;

/// Print one environment name per line, in declared order
pub fn execute(source: Source<'_>) -> Result<()> {
    let (_, matrix) = load_matrix(source, Vec::new())?;

    for name in matrix.envlist() {
        println!("{}", name);
    }

    Ok(())
}
