//! Durable update store for hangar.
//!
//! Two logical tables (updates, assets) plus a relation table, persisted in
//! an embedded SQLite database. Multi-row writes are transactional: a crash
//! mid-write never leaves a referenced-but-missing asset or an update with
//! zero assets visible to readers.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{AssetRow, AssetStats, UpdateAssetRow, UpdateRow};
pub use repos::{AssetRepo, UpdateRepo};
pub use store::{SqliteStore, UpdateStore};
