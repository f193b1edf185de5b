// Utility Functions
// Configuration file discovery and process environment snapshots

use crate::error::{ServiceError, ServiceResult};

use std::path::{Path, PathBuf};

/// File names searched for, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["tox.ini", "envmatrix.ini"];

/// Find a matrix declaration by walking up from the given starting path.
///
/// In each ancestor directory the names in `CONFIG_FILE_NAMES` are tried in
/// order; the first existing file wins. Returns `None` when no ancestor
/// contains one.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    for ancestor in start.ancestors() {
        for name in CONFIG_FILE_NAMES {
            let candidate = ancestor.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Resolve the declaration to use: an explicit path wins, otherwise search
/// upwards from `start`.
pub fn resolve_config(explicit: Option<&Path>, start: &Path) -> ServiceResult<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ServiceError::ConfigNotFound {
            start: path.to_path_buf(),
            candidates: vec![path.display().to_string()],
        });
    }

    find_config(start).ok_or_else(|| ServiceError::ConfigNotFound {
        start: start.to_path_buf(),
        candidates: CONFIG_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
    })
}

/// Snapshot the process environment.
///
/// Variables whose name or value is not valid UTF-8 are skipped; child
/// processes still inherit them from the process itself.
pub fn process_env<C>() -> C
where
    C: FromIterator<(String, String)>,
{
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}
