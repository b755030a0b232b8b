//! # crudkit - policy-filtered record management
//!
//! crudkit sits between untrusted request input and a record store. It lists,
//! shows, creates, updates and deletes records of one type while enforcing a
//! field-level allow-list: submitted keys that name unknown, read-only or
//! private fields are dropped before anything is saved.
//!
//! ## Core Concepts
//!
//! - **FieldPolicy**: which fields are writable, read-only, or private
//! - **Repository**: persistence for one record type
//! - **RecordEngine**: CRUD operations, reconciliation, tables and forms
//! - **InputSource**: the submitted key/value payload of a request
//!
//! ## Usage
//!
//! ```rust
//! use crudkit::{FieldName, InMemoryRepository, InputMap, Listing, RecordEngine, RecordSchema};
//!
//! let schema = RecordSchema::new("users")
//!     .unwrap()
//!     .column(FieldName::new("email").unwrap())
//!     .column_with_default(FieldName::new("role").unwrap(), "member")
//!     .with_timestamps();
//!
//! let mut engine = RecordEngine::new(InMemoryRepository::new(schema));
//! engine.mark_read_only([FieldName::new("role").unwrap()]);
//!
//! let input = InputMap::new().with("email", "a@b.com").with("role", "admin");
//! engine.do_create(&input).unwrap();
//!
//! let Listing::Table(table) = engine.list(true).unwrap() else { unreachable!() };
//! assert_eq!(table.cell(0, "role").unwrap().as_str(), Some("member"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod field;
pub mod record;
pub mod value;

// Policy, configuration and request input
pub mod config;
pub mod input;
pub mod policy;

// Output shapes
pub mod form;
pub mod table;

// Engine and persistence
pub mod engine;
pub mod storage;

pub use config::{ActionRoutes, EngineConfig, FormStyle};
pub use engine::RecordEngine;
pub use error::{CrudError, CrudResult, ValidationError};
pub use field::{FieldName, FieldSet};
pub use form::{FormDescriptor, FormEntry, FormOptions};
pub use input::{InputMap, InputSource};
pub use policy::{FieldAccess, FieldPolicy};
pub use record::{ColumnDef, DynamicRecord, Record, RecordId, RecordSchema};
pub use table::{ActionKind, HeaderCell, Listing, Projection, RecordTable, RowAction, TableRow};
pub use value::Value;

pub use storage::{IdStrategy, InMemoryRepository, Repository, StorageError};
#[cfg(feature = "sqlite")]
pub use storage::SqliteRepository;
