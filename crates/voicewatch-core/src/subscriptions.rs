//! Voice-channel watch subscriptions
//!
//! Two tables back the watch list:
//! - **watchers**: subject id -> ids of the users watching that subject
//! - **contacts**: watcher id -> single contact address (e.g. a phone number)
//!
//! `Subscriptions` owns both stores and is the only place that decides which
//! table an event touches. Front ends (chat bot, CLI) call these methods and
//! never see the file format.

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::store::{Lookup, MergePolicy, RecordStore, StoreResult};

/// Result of asking to stop watching a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The watcher was removed from the subject's list
    Stopped,
    /// The watcher was not watching the subject; nothing was written
    NotMonitoring,
}

/// Someone to notify when a subject joins a voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationTarget {
    pub watcher: String,
    /// Contact address, when the watcher registered one
    pub contact: Option<String>,
}

/// Watch-list service over the watchers and contacts tables
#[derive(Debug, Clone)]
pub struct Subscriptions {
    watchers: RecordStore,
    contacts: RecordStore,
}

impl Subscriptions {
    /// Open both tables at the locations named by `config`
    pub fn open(config: &Config) -> StoreResult<Self> {
        let watchers = RecordStore::with_delimiter(config.watchers_path(), config.delimiter)?;
        let contacts = RecordStore::with_delimiter(config.contacts_path(), config.delimiter)?;
        Ok(Self::new(watchers, contacts))
    }

    pub fn new(watchers: RecordStore, contacts: RecordStore) -> Self {
        Self { watchers, contacts }
    }

    /// The subject -> watchers table
    pub fn watchers(&self) -> &RecordStore {
        &self.watchers
    }

    /// The watcher -> contact table
    pub fn contacts(&self) -> &RecordStore {
        &self.contacts
    }

    /// Start watching `subject`, optionally recording how to reach the watcher
    ///
    /// Watching twice is harmless. A new contact replaces the old one.
    pub async fn monitor(
        &self,
        subject: &str,
        watcher: &str,
        contact: Option<&str>,
    ) -> StoreResult<()> {
        // Validate everything up front so a bad contact can't leave a half-done subscription
        self.watchers.validate_record(subject, &[watcher])?;
        if let Some(contact) = contact {
            self.contacts.validate_record(watcher, &[contact])?;
        }

        self.watchers
            .write(subject, &[watcher], MergePolicy::Merge)
            .await?;
        if let Some(contact) = contact {
            self.set_contact(watcher, contact).await?;
        }

        info!("{} is now watching {}", watcher, subject);
        Ok(())
    }

    /// Stop `watcher` from watching `subject`
    ///
    /// The subject's record disappears once its last watcher leaves.
    pub async fn stop_monitoring(&self, subject: &str, watcher: &str) -> StoreResult<StopOutcome> {
        let outcome = match self.watchers.delete_member(subject, watcher).await? {
            Lookup::Found(removed) if removed > 0 => StopOutcome::Stopped,
            _ => StopOutcome::NotMonitoring,
        };

        if outcome == StopOutcome::Stopped {
            info!("{} stopped watching {}", watcher, subject);
        }
        Ok(outcome)
    }

    /// Everyone to notify when `subject` joins a voice channel
    pub async fn notification_targets(&self, subject: &str) -> StoreResult<Vec<NotificationTarget>> {
        let Lookup::Found(watchers) = self.watchers.read(subject).await? else {
            return Ok(Vec::new());
        };

        let contacts = self.contacts.entries().await?;
        Ok(watchers
            .into_iter()
            .map(|watcher| {
                let contact = contacts
                    .get(&watcher)
                    .and_then(|slot| slot.first())
                    .cloned();
                NotificationTarget { watcher, contact }
            })
            .collect())
    }

    /// Subjects `watcher` is currently watching
    pub async fn watched_by(&self, watcher: &str) -> StoreResult<Vec<String>> {
        self.watchers.keys_with_member(watcher).await
    }

    /// Current contact address of `watcher`
    pub async fn contact(&self, watcher: &str) -> StoreResult<Option<String>> {
        Ok(self
            .contacts
            .read(watcher)
            .await?
            .found()
            .and_then(|slot| slot.into_iter().next()))
    }

    /// Record or replace the contact address of `watcher`
    pub async fn set_contact(&self, watcher: &str, contact: &str) -> StoreResult<()> {
        self.contacts
            .write(watcher, &[contact], MergePolicy::Replace)
            .await
    }

    /// Drop the contact address of `watcher`
    pub async fn forget_contact(&self, watcher: &str) -> StoreResult<Lookup<()>> {
        Ok(self.contacts.delete(watcher).await?.map(|_| ()))
    }
}
