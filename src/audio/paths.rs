//! Sequential recording filenames.
//!
//! Recordings are stored as `<dir>/<base>_<N>.wav`. N is one past the highest
//! index already present in the directory; nothing is persisted, so two
//! recorders writing to the same directory at once may pick the same name.

use crate::error::ApplianceError;
use std::fs;
use std::path::{Path, PathBuf};

/// Create the recordings directory if it doesn't exist.
pub fn create_recordings_dir(dir: &Path) -> Result<(), ApplianceError> {
    fs::create_dir_all(dir).map_err(|e| ApplianceError::filesystem(dir, e))
}

/// Parse the index out of `<base>_<N>.wav`
fn recording_index(file_name: &str, base: &str) -> Option<u64> {
    file_name
        .strip_prefix(base)?
        .strip_prefix('_')?
        .strip_suffix(".wav")?
        .parse()
        .ok()
}

/// Path for the next recording, scanning `dir` for the highest used index.
pub fn next_recording_path(dir: &Path, base: &str) -> Result<PathBuf, ApplianceError> {
    create_recordings_dir(dir)?;

    let entries = fs::read_dir(dir).map_err(|e| ApplianceError::filesystem(dir, e))?;
    let next = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| recording_index(&e.file_name().to_string_lossy(), base))
        .max()
        .map_or(0, |n| n + 1);

    Ok(dir.join(format!("{}_{}.wav", base, next)))
}
