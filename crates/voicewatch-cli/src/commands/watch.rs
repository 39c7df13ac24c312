//! Watch-list command handlers

use anyhow::{Context, Result};

use voicewatch_core::{StopOutcome, Subscriptions};

use crate::output::Output;

/// Start watching a subject
pub async fn monitor(
    subs: &Subscriptions,
    subject: String,
    watcher: String,
    contact: Option<String>,
    output: &Output,
) -> Result<()> {
    subs.monitor(&subject, &watcher, contact.as_deref())
        .await
        .context("Failed to record subscription")?;

    output.success(&format!(
        "{} will be notified when {} joins a voice channel",
        watcher, subject
    ));
    Ok(())
}

/// Stop watching a subject
pub async fn stop(
    subs: &Subscriptions,
    subject: String,
    watcher: String,
    output: &Output,
) -> Result<()> {
    let outcome = subs
        .stop_monitoring(&subject, &watcher)
        .await
        .context("Failed to remove subscription")?;

    match outcome {
        StopOutcome::Stopped => output.success(&format!(
            "{} will no longer receive notifications for {}",
            watcher, subject
        )),
        StopOutcome::NotMonitoring => {
            output.message(&format!("{} is not watching {}", watcher, subject))
        }
    }
    Ok(())
}

/// Show who gets notified when a subject joins
pub async fn targets(subs: &Subscriptions, subject: String, output: &Output) -> Result<()> {
    let targets = subs
        .notification_targets(&subject)
        .await
        .context("Failed to look up watchers")?;

    output.print_targets(&subject, &targets);
    Ok(())
}

/// Show the subjects a watcher follows
pub async fn watching(subs: &Subscriptions, watcher: String, output: &Output) -> Result<()> {
    let subjects = subs
        .watched_by(&watcher)
        .await
        .context("Failed to look up subscriptions")?;

    output.print_subjects(&watcher, &subjects);
    Ok(())
}

/// Show, set or clear a watcher's contact address
pub async fn contact(
    subs: &Subscriptions,
    watcher: String,
    set: Option<String>,
    forget: bool,
    output: &Output,
) -> Result<()> {
    if let Some(address) = set {
        subs.set_contact(&watcher, &address)
            .await
            .context("Failed to save contact")?;
        output.success(&format!("Contact for {} set to {}", watcher, address));
        return Ok(());
    }

    if forget {
        if subs
            .forget_contact(&watcher)
            .await
            .context("Failed to remove contact")?
            .is_found()
        {
            output.success(&format!("Removed contact for {}", watcher));
        } else {
            output.message(&format!("No contact recorded for {}", watcher));
        }
        return Ok(());
    }

    match subs.contact(&watcher).await.context("Failed to read contact")? {
        Some(address) => output.print_members(&watcher, &[address]),
        None => output.message(&format!("No contact recorded for {}", watcher)),
    }
    Ok(())
}
