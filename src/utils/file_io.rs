use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::error;

use crate::Result;

pub(crate) fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory: {:?}", e);
                return Err(e.into());
            }
        }
    }
    Ok(())
}

pub(crate) fn open_file_for_append(path: &Path) -> Result<File> {
    create_parent_dir_if_not_exist(path)?;
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    Ok(file)
}

/// Appends one line and syncs it to disk.
pub(crate) fn append_line(
    path: &Path,
    line: &str,
) -> Result<()> {
    let mut file = open_file_for_append(path)?;
    writeln!(file, "{line}")?;
    file.sync_data()?;
    Ok(())
}

/// Creates `path` empty unless it already exists.
pub(crate) fn touch(path: &Path) -> Result<()> {
    open_file_for_append(path)?;
    Ok(())
}
