//! File migration plumbing: move, copy, hardlink and directory merging

use crate::config::FileOperation;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Resolve filename conflicts by adding a numeric suffix
pub fn resolve_filename_conflict(mut path: PathBuf) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path);
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Format {
            name: path.display().to_string(),
            message: "file name is not valid UTF-8".into(),
        })?
        .to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let parent = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();

    for i in 1..10000 {
        let new_name = format!("{}_{}{}", stem, i, extension);
        path = parent.join(new_name);
        if !path.exists() {
            return Ok(path);
        }
    }

    Err(Error::Format {
        name: parent.join(format!("{}{}", stem, extension)).display().to_string(),
        message: "could not resolve filename conflict".into(),
    })
}

/// Perform the actual file operation (move, copy, hardlink)
pub fn perform_file_operation(source: &Path, dest: &Path, operation: FileOperation) -> Result<()> {
    // Create parent directory
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;
    }

    let mtime = fs::metadata(source).and_then(|m| m.modified()).ok();

    match operation {
        FileOperation::Copy => {
            copy_file(source, dest)?;
        }
        FileOperation::Move => {
            move_file(source, dest)?;
        }
        FileOperation::Hardlink => {
            fs::hard_link(source, dest).map_err(|e| Error::storage(source, e))?;
        }
    }

    // Preserve modification time
    if operation != FileOperation::Hardlink
        && let Some(mtime) = mtime
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    Ok(())
}

/// Move a file, falling back to copy + delete across file systems
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    // Try rename first (faster for same filesystem)
    if fs::rename(source, dest).is_err() {
        copy_file(source, dest)?;
        fs::remove_file(source).map_err(|e| Error::storage(source, e))?;
    }
    Ok(())
}

/// Copy file with buffered I/O for efficiency
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source).map_err(|e| Error::storage(source, e))?;
    let dest_file = File::create(dest).map_err(|e| Error::storage(dest, e))?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}

/// Move everything below `source` into `dest`.
///
/// Directories present on both sides are merged recursively, conflicting
/// file names get a numeric suffix. `source` itself is left in place (empty).
pub fn move_dir_contents(source: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| Error::storage(dest, e))?;

    let mut moved = 0;
    for entry in WalkDir::new(source).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let target = dest.join(entry.file_name());

        if entry.file_type().is_dir() {
            if target.is_dir() {
                moved += move_dir_contents(entry.path(), &target)?;
                fs::remove_dir(entry.path()).map_err(|e| Error::storage(entry.path(), e))?;
            } else {
                let target = resolve_filename_conflict(target)?;
                fs::rename(entry.path(), &target).map_err(|e| Error::storage(entry.path(), e))?;
                moved += 1;
            }
        } else {
            let target = resolve_filename_conflict(target)?;
            trace!(source = ?entry.path(), ?target, "Moving entry");
            move_file(entry.path(), &target)?;
            moved += 1;
        }
    }

    debug!(?source, ?dest, moved, "Moved directory contents");
    Ok(moved)
}

/// Whether a directory has no entries
pub fn is_dir_empty(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| Error::storage(path, e))?;
    Ok(entries.next().is_none())
}

/// Delete `path` if it is an empty directory. Returns whether it was removed.
pub fn delete_empty_dir(path: &Path) -> Result<bool> {
    if is_dir_empty(path)? {
        fs::remove_dir(path).map_err(|e| Error::storage(path, e))?;
        return Ok(true);
    }
    Ok(false)
}
