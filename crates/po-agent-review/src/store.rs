use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::ReviewError;
use crate::model::ReviewJsonResult;
use crate::repair::parse_review_json;

/// Serializes a review in the persisted format: 2-space indentation and a
/// trailing newline.
pub fn to_persisted_json(result: &ReviewJsonResult) -> Result<String, ReviewError> {
    let mut text = serde_json::to_string_pretty(result)?;
    text.push('\n');
    Ok(text)
}

/// Writes `result` to `path`, creating missing parent directories.
pub fn save_review_file(path: &Path, result: &ReviewJsonResult) -> Result<(), ReviewError> {
    let io_error = |source| ReviewError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, to_persisted_json(result)?).map_err(io_error)?;
    debug!(path = %path.display(), issues = result.issues.len(), "review saved");
    Ok(())
}

/// Reads an agent's review output and recovers the payload from it.
pub fn load_review_file(path: &Path) -> Result<ReviewJsonResult, ReviewError> {
    let raw = fs::read_to_string(path).map_err(|source| ReviewError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_review_json(&raw)
}
