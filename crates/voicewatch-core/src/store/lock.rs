//! Per-file operation locks
//!
//! Every table operation is a read-modify-write of the whole file, so two
//! operations on the same file must never interleave. Locks live in a
//! process-wide registry keyed by resolved path: any number of store handles
//! pointing at one file share a single async mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::Mutex as AsyncMutex;

pub(crate) type FileLock = Arc<AsyncMutex<()>>;

fn registry() -> &'static Mutex<HashMap<PathBuf, FileLock>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, FileLock>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get the lock guarding `path`, creating it on first use
///
/// `path` should already be absolute; see [`lock_key`].
pub(crate) fn lock_for(path: &Path) -> FileLock {
    // Inserts are single calls, so a poisoned map is still consistent
    let mut locks = registry().lock().unwrap_or_else(|e| e.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

/// Normalize a table path into the key used by the registry
///
/// The deepest existing ancestor is canonicalized, so `..` segments and
/// symlinks map to one key. Components below it that do not exist yet are
/// kept as written.
pub(crate) fn lock_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    for ancestor in absolute.ancestors() {
        let Ok(resolved) = std::fs::canonicalize(ancestor) else {
            continue;
        };
        if let Ok(rest) = absolute.strip_prefix(ancestor) {
            return if rest.as_os_str().is_empty() {
                resolved
            } else {
                resolved.join(rest)
            };
        }
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_shares_lock() {
        let a = lock_for(Path::new("/tmp/voicewatch-lock-test/a.csv"));
        let b = lock_for(Path::new("/tmp/voicewatch-lock-test/a.csv"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_paths_get_distinct_locks() {
        let a = lock_for(Path::new("/tmp/voicewatch-lock-test/one.csv"));
        let b = lock_for(Path::new("/tmp/voicewatch-lock-test/two.csv"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dot_dot_and_direct_paths_share_key() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let direct = temp_dir.path().join("watchers.csv");
        let dotted = temp_dir.path().join("sub").join("..").join("watchers.csv");

        assert_eq!(lock_key(&direct), lock_key(&dotted));
        assert!(Arc::ptr_eq(
            &lock_for(&lock_key(&direct)),
            &lock_for(&lock_key(&dotted))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_shares_key() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        let link = temp_dir.path().join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(
            lock_key(&real.join("watchers.csv")),
            lock_key(&link.join("watchers.csv"))
        );
    }

    #[test]
    fn test_relative_key_is_absolute() {
        let key = lock_key(Path::new("watchers.csv"));
        assert!(key.is_absolute());
        assert!(key.ends_with("watchers.csv"));
    }
}
