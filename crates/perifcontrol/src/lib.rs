//! `perifcontrol` - Peripheral inventory for technical-support teams
//!
//! This library tracks cameras, card readers, e-CPF readers and biometric
//! devices installed at sites, in stock and disposed of. Every collection is a
//! JSON array kept under a fixed key in a [`KeyValueStore`]; the
//! [`Repository`] does the read-modify-write and the query modules
//! ([`lookup`], [`dashboard`], [`report`]) work over an in-memory
//! [`Inventory`] snapshot.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod certificate;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod import;
pub mod inventory;
pub mod logging;
pub mod lookup;
pub mod preferences;
pub mod record;
pub mod report;
pub mod repository;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use inventory::Inventory;
pub use logging::init_logging;
pub use preferences::UserPreferences;
pub use record::{
    Collection, DisposalReason, DisposalRecord, InstalledRecord, PeripheralKind, Record,
    ReplacementReason, SiteCode, StockRecord,
};
pub use repository::Repository;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StoreStats};
