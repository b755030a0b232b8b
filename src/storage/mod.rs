//! Storage backends for crudkit.
//!
//! [`Repository`] is the persistence contract the engine depends on.
//! Two implementations ship with the crate: [`InMemoryRepository`] and, with
//! the `sqlite` feature, [`SqliteRepository`].

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use memory::{IdStrategy, InMemoryRepository};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
pub use traits::{Repository, StorageError};
