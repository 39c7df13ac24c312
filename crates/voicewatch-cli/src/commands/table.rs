//! Raw table maintenance handlers

use anyhow::{bail, Context, Result};

use voicewatch_core::{Lookup, MergeOutcome, MergePolicy, RecordStore};

use crate::output::Output;

/// List every record
pub async fn list(store: &RecordStore, output: &Output) -> Result<()> {
    let table = store
        .entries()
        .await
        .with_context(|| format!("Failed to read {:?}", store.path()))?;

    output.print_records(&table);
    Ok(())
}

/// Show one record
pub async fn get(store: &RecordStore, key: String, output: &Output) -> Result<()> {
    match store.read(&key).await.context("Failed to read record")? {
        Lookup::Found(members) => output.print_members(&key, &members),
        Lookup::NotFound => bail!("Key not found: {}", key),
    }
    Ok(())
}

/// Create or extend a record
pub async fn write(
    store: &RecordStore,
    key: String,
    values: Vec<String>,
    replace: bool,
    claim_check: bool,
    output: &Output,
) -> Result<()> {
    if claim_check {
        let outcome = store
            .merge_unless_claimed(&key, &values)
            .await
            .context("Failed to write record")?;
        if let MergeOutcome::Replaced { claimed_by } = outcome {
            output.message(&format!(
                "{} is already held by {}; replaced {} instead of merging",
                values[0],
                claimed_by.join(", "),
                key
            ));
        }
    } else {
        let policy = if replace {
            MergePolicy::Replace
        } else {
            MergePolicy::Merge
        };
        store
            .write(&key, &values, policy)
            .await
            .context("Failed to write record")?;
    }

    output.success(&format!("Wrote {}", key));
    Ok(())
}

/// Replace an existing record's members
pub async fn update(
    store: &RecordStore,
    key: String,
    values: Vec<String>,
    output: &Output,
) -> Result<()> {
    match store
        .update(&key, &values)
        .await
        .context("Failed to update record")?
    {
        Lookup::Found(()) => output.success(&format!("Updated {}", key)),
        Lookup::NotFound => bail!("Key not found: {}", key),
    }
    Ok(())
}

/// Delete a whole record
pub async fn delete(store: &RecordStore, key: String, output: &Output) -> Result<()> {
    let removed = store.delete(&key).await.context("Failed to delete record")?;
    if removed.is_not_found() {
        bail!("Key not found: {}", key);
    }

    output.success(&format!("Deleted {}", key));
    Ok(())
}

/// Remove one member from a record
pub async fn remove_member(
    store: &RecordStore,
    key: String,
    member: String,
    output: &Output,
) -> Result<()> {
    match store
        .delete_member(&key, &member)
        .await
        .context("Failed to remove member")?
    {
        Lookup::Found(0) => output.message(&format!("{} is not in {}", member, key)),
        Lookup::Found(n) => output.success(&format!("Removed {} x {} from {}", n, member, key)),
        Lookup::NotFound => bail!("Key not found: {}", key),
    }
    Ok(())
}
