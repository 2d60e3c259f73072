//! herdbook-core - Core library for Herdbook
//!
//! This crate contains the shared models, the libsql local store, and the
//! cloud synchronization engine used by all Herdbook interfaces
//! (desktop, mobile).

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Animal, AnimalId, FarmSettings, Herd, HerdId};
pub use sync::{SyncEngine, SyncError, SyncStage, SyncSummary};
