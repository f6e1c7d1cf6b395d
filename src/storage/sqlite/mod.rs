// File: src/storage/sqlite/mod.rs

mod batches;
mod config;
mod convert;
mod records;
mod schema;
mod store;

pub use config::SqliteConfig;
pub use store::SqliteStore;
