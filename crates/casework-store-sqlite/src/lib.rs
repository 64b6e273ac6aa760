//! SQLite backend for the Casework stores.
//!
//! One [`SqliteStore`] implements the case registry, the user progress store,
//! and the artifact store, each over its own tables. Wraps [`tokio_rusqlite`]
//! so all database access runs on a dedicated thread without blocking the
//! async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
