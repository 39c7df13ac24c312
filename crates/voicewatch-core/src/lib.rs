//! voicewatch Core Library
//!
//! This crate provides the storage behind voicewatch, a voice-channel watch
//! list: users ask to be told when someone joins a voice channel, and the
//! subscriptions survive restarts.
//!
//! # Architecture
//!
//! - **RecordStore**: one delimited text file per table, mapping a key to an
//!   ordered list of members. Whole-file load/modify/save with atomic
//!   replace, serialized per file within the process.
//! - **Subscriptions**: the watchers and contacts tables and the flows a
//!   front end drives (monitor, stop, who-to-notify).
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let subs = Subscriptions::open(&config)?;
//!
//! subs.monitor("1001", "2002", Some("+15550100")).await?;
//! let targets = subs.notification_targets("1001").await?;
//! ```
//!
//! # Modules
//!
//! - `store`: record store, line codec, errors
//! - `subscriptions`: watch-list service
//! - `config`: application configuration

pub mod config;
pub mod store;
pub mod subscriptions;

pub use config::Config;
pub use store::{Lookup, MergeOutcome, MergePolicy, RecordStore, StoreError, StoreResult, Table};
pub use subscriptions::{NotificationTarget, StopOutcome, Subscriptions};
