pub mod list;
pub mod run;
pub mod show;
pub mod validate;

use crate::output;

use std::path::{Path, PathBuf};

use color_eyre::Result;

use matrix_service::{resolve_config, Matrix, MatrixParser, ParserOptions};

/// Where the declaration comes from and how strictly it is read
#[derive(Debug, Clone, Copy, Default)]
pub struct Source<'a> {
    pub config: Option<&'a Path>,
    pub options: ParserOptions,
}

/// Locate the declaration to use from the `--config` flag or the current directory
pub fn locate(config: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(resolve_config(config, &cwd)?)
}

/// Locate and parse the declaration, exiting with status 1 on a configuration error
pub fn load_matrix(source: Source<'_>, posargs: Vec<String>) -> Result<(PathBuf, Matrix)> {
    let path = locate(source.config)?;

    match MatrixParser::parse_file_with(&path, posargs, source.options) {
        Ok(matrix) => Ok((path, matrix)),
        Err(e) => {
            eprint!("{}", e);
            output::failure(&format!("{} is not a valid declaration", path.display()));
            std::process::exit(1);
        }
    }
}
