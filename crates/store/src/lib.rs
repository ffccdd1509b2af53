//! Storage adapters implementing the `milla-core` collaborator traits.
//!
//! - [`SqliteStore`]: durable store, one SQLite file per installation
//! - [`MemoryStore`]: in-process store for tests and dry runs
//! - [`Dataset`]: typed TOML seed data standing in for spreadsheet imports

pub mod dataset;
pub mod memory;
pub mod sqlite;

pub use dataset::{Dataset, LoadRecord, Recipient, SeedSummary};
pub use memory::{MemoryStore, RecordingSink};
pub use sqlite::{SqliteStore, StoredDespatchLine};
