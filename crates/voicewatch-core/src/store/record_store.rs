//! File-backed record store
//!
//! A `RecordStore` is one table: a file of `key -> members` records. Every
//! operation loads the whole file, computes the new table, and writes it
//! back with an atomic replace (temp file, sync, rename), so a crash never
//! leaves a truncated table behind.
//!
//! Operations on the same file are serialized within the process through a
//! shared per-file lock. Other processes writing the same file concurrently
//! are not supported.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::codec::{Codec, Table};
use super::error::{StoreError, StoreResult};
use super::lock::{lock_for, lock_key, FileLock};

/// How `write` treats an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Union with the existing members, keeping first-seen order
    #[default]
    Merge,
    /// Overwrite the existing members
    Replace,
}

/// Result of an operation that needs the key to exist
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    /// Convert into an `Option`, dropping the distinction's name
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// What `merge_unless_claimed` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record held the first value; merged as a normal `Merge` write
    Merged,
    /// The first value was already held by these keys; the record was replaced
    Replaced { claimed_by: Vec<String> },
}

/// A durable `key -> members` table stored in one delimited text file
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    codec: Codec,
    lock: FileLock,
}

impl RecordStore {
    /// Open a table at `path` using the default `,` delimiter
    ///
    /// The file does not need to exist; it is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path.into(), Codec::default())
    }

    /// Open a table at `path` with a custom delimiter
    pub fn with_delimiter(path: impl Into<PathBuf>, delimiter: char) -> StoreResult<Self> {
        Ok(Self::with_codec(path.into(), Codec::new(delimiter)?))
    }

    fn with_codec(path: PathBuf, codec: Codec) -> Self {
        let lock = lock_for(&lock_key(&path));
        Self { path, codec, lock }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ==================== Writes ====================

    /// Create or extend a record
    ///
    /// With `Merge`, values not already present are appended to the existing
    /// members in input order. With `Replace`, or when the key is new, the
    /// record becomes exactly `values`.
    pub async fn write<S: AsRef<str>>(
        &self,
        key: &str,
        values: &[S],
        policy: MergePolicy,
    ) -> StoreResult<()> {
        let values = self.checked(key, values)?;

        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;

        match table.get_mut(key) {
            Some(existing) if policy == MergePolicy::Merge => merge_members(existing, values),
            _ => {
                table.insert(key.to_string(), values);
            }
        }

        self.save(&table).await?;
        info!("Wrote key {:?} ({:?}) to {:?}", key, policy, self.path);
        Ok(())
    }

    /// Merge into `key` unless another record already holds `values[0]`
    ///
    /// When any record (the target included) already lists the first value,
    /// the target record is replaced with `values` instead of merged.
    pub async fn merge_unless_claimed<S: AsRef<str>>(
        &self,
        key: &str,
        values: &[S],
    ) -> StoreResult<MergeOutcome> {
        let values = self.checked(key, values)?;

        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;

        let first = &values[0];
        let claimed_by: Vec<String> = table
            .iter()
            .filter(|(_, members)| members.contains(first))
            .map(|(holder, _)| holder.clone())
            .collect();

        let outcome = if claimed_by.is_empty() {
            match table.get_mut(key) {
                Some(existing) => merge_members(existing, values),
                None => {
                    table.insert(key.to_string(), values);
                }
            }
            MergeOutcome::Merged
        } else {
            debug!(
                "Value {:?} already held by {:?}; replacing {:?}",
                first, claimed_by, key
            );
            table.insert(key.to_string(), values);
            MergeOutcome::Replaced { claimed_by }
        };

        self.save(&table).await?;
        info!("Wrote key {:?} to {:?}: {:?}", key, self.path, outcome);
        Ok(outcome)
    }

    /// Replace the members of an existing record; never creates one
    pub async fn update<S: AsRef<str>>(&self, key: &str, values: &[S]) -> StoreResult<Lookup<()>> {
        let values = self.checked(key, values)?;

        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;

        match table.get_mut(key) {
            Some(existing) => *existing = values,
            None => {
                debug!("Update skipped, key {:?} not in {:?}", key, self.path);
                return Ok(Lookup::NotFound);
            }
        }

        self.save(&table).await?;
        info!("Updated key {:?} in {:?}", key, self.path);
        Ok(Lookup::Found(()))
    }

    /// Remove a record, returning the members it held
    pub async fn delete(&self, key: &str) -> StoreResult<Lookup<Vec<String>>> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;

        let Some(removed) = table.shift_remove(key) else {
            debug!("Delete skipped, key {:?} not in {:?}", key, self.path);
            return Ok(Lookup::NotFound);
        };

        self.save(&table).await?;
        info!("Deleted key {:?} from {:?}", key, self.path);
        Ok(Lookup::Found(removed))
    }

    /// Remove every occurrence of `member` from a record
    ///
    /// Returns how many entries were removed. A record left with no members
    /// is deleted. Removing nothing is not an error and does not touch the
    /// file.
    pub async fn delete_member(&self, key: &str, member: &str) -> StoreResult<Lookup<usize>> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;

        let Some(members) = table.get_mut(key) else {
            debug!("Member removal skipped, key {:?} not in {:?}", key, self.path);
            return Ok(Lookup::NotFound);
        };

        let before = members.len();
        members.retain(|m| m != member);
        let removed = before - members.len();

        if members.is_empty() {
            table.shift_remove(key);
        } else if removed == 0 {
            return Ok(Lookup::Found(0));
        }

        self.save(&table).await?;
        info!(
            "Removed {} x {:?} from key {:?} in {:?}",
            removed, member, key, self.path
        );
        Ok(Lookup::Found(removed))
    }

    // ==================== Reads ====================

    /// Get the members of a record
    pub async fn read(&self, key: &str) -> StoreResult<Lookup<Vec<String>>> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        Ok(table.shift_remove(key).into())
    }

    /// Check whether a record exists
    pub async fn contains(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.contains_key(key))
    }

    /// All records, in file order
    pub async fn entries(&self) -> StoreResult<Table> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Keys whose members include `member`, in file order
    pub async fn keys_with_member(&self, member: &str) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        let table = self.load().await?;
        Ok(table
            .into_iter()
            .filter(|(_, members)| members.iter().any(|m| m == member))
            .map(|(key, _)| key)
            .collect())
    }

    // ==================== File access ====================

    /// Check a record against the format rules without touching the file
    pub fn validate_record<S: AsRef<str>>(&self, key: &str, values: &[S]) -> StoreResult<()> {
        self.checked(key, values).map(|_| ())
    }

    fn checked<S: AsRef<str>>(&self, key: &str, values: &[S]) -> StoreResult<Vec<String>> {
        self.codec.validate_key(key)?;
        let values: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        self.codec.validate_members(&values)?;
        Ok(values)
    }

    /// Read the whole table; a missing file is an empty table
    async fn load(&self) -> StoreResult<Table> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Table {:?} does not exist yet", self.path);
                return Ok(Table::new());
            }
            Err(e) => return Err(StoreError::from_read_io(e, self.path.clone())),
        };

        let content = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            StoreError::Decode {
                path: self.path.clone(),
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                details: "content is not valid UTF-8".to_string(),
            }
        })?;

        let table = self.codec.decode(&content, &self.path)?;
        debug!("Loaded {} record(s) from {:?}", table.len(), self.path);
        Ok(table)
    }

    /// Write the table back, leaving out records with no members
    async fn save(&self, table: &Table) -> StoreResult<()> {
        let empty = table.values().filter(|members| members.is_empty()).count();
        if empty > 0 {
            warn!(
                "Dropping {} record(s) with no members from {:?}",
                empty, self.path
            );
        }

        let content = self.codec.encode(table);
        atomic_write(&self.path, content.as_bytes()).await?;
        debug!("Saved {} record(s) to {:?}", table.len() - empty, self.path);
        Ok(())
    }
}

/// Append values not already present, in input order
fn merge_members(existing: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        if !existing.contains(&value) {
            existing.push(value);
        }
    }
}

/// Sibling temp path: `watchers.csv` -> `watchers.csv.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync it to disk and close it
/// 3. Rename the temp file onto the target path
///
/// The target is never left partially written. On failure the temp file
/// is removed.
async fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let temp_path = temp_path(path);

    if let Err(e) = write_synced(&temp_path, data).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(source) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StoreError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Create `path`, write `data`, and sync; the file is closed when this returns
async fn write_synced(path: &Path, data: &[u8]) -> StoreResult<()> {
    let io_err = |e| StoreError::from_write_io(e, path.to_path_buf());

    let mut file = File::create(path).await.map_err(io_err)?;
    file.write_all(data).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;

    Ok(())
}
