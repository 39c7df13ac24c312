//! Record storage
//!
//! Durable `key -> members` tables, one delimited text file per table.
//!
//! ## Layout
//!
//! - `codec`: line format (decode, encode, field validation)
//! - `record_store`: the `RecordStore` and its operations
//! - `lock`: per-file serialization of operations within the process
//! - `error`: typed errors

pub mod codec;
pub mod error;
mod lock;
pub mod record_store;

pub use codec::{Codec, Table, DEFAULT_DELIMITER};
pub use error::{StoreError, StoreResult};
pub use record_store::{Lookup, MergeOutcome, MergePolicy, RecordStore};
