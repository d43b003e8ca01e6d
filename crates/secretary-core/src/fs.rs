//! Filesystem utilities for atomic replacement with a rotating backup.
//!
//! A save is split into three steps so each can be observed on its own:
//! [`stage_temp`] writes and syncs a sibling temp file, [`rotate_backup`]
//! moves the current file aside under a timestamped name, and
//! [`rename_with_fallback`] promotes the temp file. [`write_atomic`] runs
//! all three in order.

use std::fs;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;

use crate::error::{Result, SecretaryError};

const BACKUP_EXTENSION: &str = "bak";

/// Atomically rename a file, with fallback for platforms where rename fails if target exists.
///
/// On some platforms (notably Windows), `fs::rename` fails if the destination already exists.
/// This function handles that case by removing the destination first and retrying.
///
/// If the rename ultimately fails, the temp file is cleaned up.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "Atomic rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

fn split_path(path: &Path) -> Result<(&Path, &str)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| SecretaryError::Storage("Invalid database filename".to_string()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((parent, filename))
}

/// Write `data` to a fresh sibling of `path` and fsync it.
///
/// Returns the temp file's path; the target itself is untouched.
pub fn stage_temp(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let (parent, filename) = split_path(path)?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SecretaryError::Storage(format!("System time error: {}", e)))?
        .as_nanos();
    let temp_path = parent.join(format!("{}.{}.tmp", filename, nanos));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| SecretaryError::Storage(format!("Temp file create failed: {}", e)))?;
    file.write_all(data)
        .map_err(|e| SecretaryError::Storage(format!("Temp file write failed: {}", e)))?;
    file.sync_all()
        .map_err(|e| SecretaryError::Storage(format!("Temp file sync failed: {}", e)))?;

    Ok(temp_path)
}

/// Name of the backup `path` would be rotated to right now.
pub fn backup_path(path: &Path) -> Result<PathBuf> {
    let (parent, filename) = split_path(path)?;
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    Ok(parent.join(format!("{}.{}.{}", filename, stamp, BACKUP_EXTENSION)))
}

/// All backups of `path` currently on disk, oldest first.
pub fn list_backups(path: &Path) -> Result<Vec<PathBuf>> {
    let (parent, filename) = split_path(path)?;
    let prefix = format!("{}.", filename);
    let suffix = format!(".{}", BACKUP_EXTENSION);

    let mut backups = Vec::new();
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        {
            if !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()) {
                backups.push(entry.path());
            }
        }
    }
    backups.sort();
    Ok(backups)
}

/// Move the current file at `path` aside as its single timestamped backup.
///
/// A plain rename: if it fails, `path` stays where it is.
/// Older backups of the same file are removed once the new one is in place.
/// Returns `None` when there was nothing to back up.
pub fn rotate_backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let backup = backup_path(path)?;
    fs::rename(path, &backup)
        .map_err(|e| SecretaryError::Storage(format!("Backup rename failed: {}", e)))?;

    for stale in list_backups(path)? {
        if stale != backup {
            tracing::debug!(path = %stale.display(), "removing stale backup");
            let _ = fs::remove_file(&stale);
        }
    }

    Ok(Some(backup))
}

/// Replace `path` with `data`, keeping the previous version as a backup.
///
/// The target is never deleted outright: it is renamed to its backup name
/// before the staged file takes its place.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<Option<PathBuf>> {
    let temp_path = stage_temp(path, data)?;
    let backup = match rotate_backup(path) {
        Ok(backup) => backup,
        Err(err) => {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
    };

    rename_with_fallback(&temp_path, path)
        .map_err(|e| SecretaryError::Storage(format!("Atomic rename failed: {}", e)))?;

    tracing::debug!(
        path = %path.display(),
        bytes = data.len(),
        backup = ?backup,
        "database file replaced"
    );
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_rename_new_file() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("temp.txt");
        let dest = dir.path().join("dest.txt");

        File::create(&temp).unwrap().write_all(b"test").unwrap();

        rename_with_fallback(&temp, &dest).unwrap();

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "test");
    }

    #[test]
    fn test_write_atomic_without_previous_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");

        let backup = write_atomic(&dest, b"first").unwrap();

        assert!(backup.is_none());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "first");
        assert!(list_backups(&dest).unwrap().is_empty());
    }

    #[test]
    fn test_write_atomic_keeps_previous_version() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");

        write_atomic(&dest, b"first").unwrap();
        let backup = write_atomic(&dest, b"second").unwrap().unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "second");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "first");
    }

    #[test]
    fn test_only_one_backup_survives() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");
        let stale = dir.path().join("vault.db.20000101000000.bak");
        File::create(&stale).unwrap().write_all(b"ancient").unwrap();

        write_atomic(&dest, b"first").unwrap();
        write_atomic(&dest, b"second").unwrap();

        let backups = list_backups(&dest).unwrap();
        assert_eq!(backups.len(), 1);
        assert!(!stale.exists());
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "first");
    }

    #[test]
    fn test_failed_rotation_keeps_current_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");
        File::create(&dest).unwrap().write_all(b"precious").unwrap();

        // Occupy every backup name the write could pick with a non-empty directory.
        let now = Local::now();
        for offset in 0..10 {
            let stamp = (now + chrono::Duration::seconds(offset)).format("%Y%m%d%H%M%S");
            let blocker = dir.path().join(format!("vault.db.{}.bak", stamp));
            fs::create_dir(&blocker).unwrap();
            File::create(blocker.join("keep")).unwrap();
        }

        assert!(write_atomic(&dest, b"new").is_err());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "precious");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_list_backups_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");
        File::create(dir.path().join("vault.db.notes.bak")).unwrap();
        File::create(dir.path().join("other.db.20240101000000.bak")).unwrap();

        assert!(list_backups(&dest).unwrap().is_empty());
    }

    #[test]
    fn test_stage_temp_leaves_target_alone() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");
        File::create(&dest).unwrap().write_all(b"current").unwrap();

        let temp = stage_temp(&dest, b"next").unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "current");
        assert_eq!(fs::read_to_string(&temp).unwrap(), "next");
    }
}
