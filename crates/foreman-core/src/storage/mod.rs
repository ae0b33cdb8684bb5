//! Storage layer for Foreman Core.
//!
//! This module provides data persistence using SQLite with the Repository
//! pattern, plus an in-memory session store for tests and ephemeral runs.

// SQL strings don't need hash-less raw strings
#![allow(clippy::needless_raw_string_hashes)]

pub mod database;
pub mod error;
pub mod repositories;

pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use repositories::{
    ComponentStore, Entity, MemorySessionStore, SessionStore, SqliteComponentStore,
    SqliteSessionStore,
};
