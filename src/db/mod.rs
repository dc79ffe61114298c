pub mod migrations;
pub mod repository;
pub mod store;

pub use store::{keys, PersistedStore, SqliteStore};

#[cfg(test)]
pub use store::MemoryStore;
