use crate::error::{CoreError, Result};
use crate::types::{DateRange, Item};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// `{subreddit}-{end date}-{start date}.json`, newest date first.
pub fn output_file_name(subreddit: &str, range: &DateRange) -> String {
    format!(
        "{}-{}-{}.json",
        subreddit,
        range.end_date().format("%Y-%m-%d"),
        range.start_date().format("%Y-%m-%d")
    )
}

pub fn output_path(dir: &Path, subreddit: &str, range: &DateRange) -> Result<PathBuf> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    Ok(dir.join(output_file_name(subreddit, range)))
}

/// Fails when `path` exists and overwriting was not requested.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(CoreError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Writes `items` as one JSON array. Non-ASCII text is written as UTF-8, not
/// escaped.
pub fn write_items(path: &Path, items: &[Item]) -> Result<()> {
    write_json_atomically(path, items)?;
    info!("Wrote {} posts to {}", items.len(), path.display());
    Ok(())
}

/// `path` only appears once the whole document has been written.
fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let staged = NamedTempFile::new_in(dir)?;
    let mut writer = BufWriter::new(staged);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;

    let staged = writer.into_inner().map_err(|e| e.into_error())?;
    staged.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), "Flushed output file");
    Ok(())
}
