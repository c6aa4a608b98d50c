//! File replacement helpers
//!
//! Ledger and result files are never written in place. A full new copy is
//! written to a uniquely named sibling temp file, flushed, then renamed over
//! the target, so readers observe either the old or the new file, never a
//! partial one.
//!
//! Read-modify-write cycles on the same path are serialized within the
//! process by [`with_path_lock`]. There is no cross-process exclusion; a
//! single server process is assumed.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::Result;

static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Run `f` while holding the in-process lock for `path`
pub fn with_path_lock<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let lock = {
        let mut locks = PATH_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };
    let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

/// Read a file, treating "not found" as `None`
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a file's raw bytes, treating "not found" as `None`
pub fn read_bytes_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Temp file path used for replacing `path`: `<name>.tmp.<uuid>` in the same directory
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp.{}", name, Uuid::new_v4().simple()))
}

/// Replace `path` with `contents` via write-temp-then-rename
///
/// Creates the parent directory if needed. If anything fails after the temp
/// file is created, the temp file is removed and the original error is
/// returned; the target is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path)?;

    let result = (|| -> std::io::Result<()> {
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            if cleanup.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    temp = %temp_path.display(),
                    error = %cleanup,
                    "Failed to remove temp file"
                );
            }
        }
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".tmp."))
            .collect()
    }

    #[test]
    fn test_write_atomic_creates_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("b").join("out.json");

        write_atomic(&target, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
        assert!(leftover_temp_files(target.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_write_atomic_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.jsonl");
        fs::write(&target, "old\n").unwrap();

        write_atomic(&target, b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
    }

    #[test]
    fn test_failed_rename_removes_temp_and_keeps_target() {
        let dir = TempDir::new().unwrap();
        // Renaming a file over a non-empty directory fails on every platform
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        assert!(write_atomic(&target, b"data").is_err());

        assert!(target.is_dir());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let target = Path::new("/data/processed_ids/general.json");
        let a = temp_path_for(target);
        let b = temp_path_for(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("general.json.tmp."));
    }

    #[test]
    fn test_read_if_exists_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_if_exists(&dir.path().join("nope")).unwrap().is_none());
        assert!(read_bytes_if_exists(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_path_lock_serializes_read_modify_write() {
        let dir = TempDir::new().unwrap();
        let target = Arc::new(dir.path().join("counter"));
        fs::write(target.as_ref(), "0").unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let target = Arc::clone(&target);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        with_path_lock(&target, || {
                            let n: u32 = fs::read_to_string(target.as_ref())?.trim().parse().unwrap();
                            write_atomic(&target, (n + 1).to_string().as_bytes())
                        })
                        .unwrap();
                    }
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(fs::read_to_string(target.as_ref()).unwrap(), "200");
    }
}
