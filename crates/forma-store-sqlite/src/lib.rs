//! SQLite backend for the forma schema store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Versions are self-chained rows in a
//! single `schemas` table; see [`chain`] for how the current pointer moves.

mod encode;
mod schema;
mod store;

pub mod chain;
pub mod entity;
pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
