//! Labtrack Store
//!
//! Repository traits for the collaborators the confirmation engine relies on,
//! plus [`MemoryStore`], a serialised in-memory implementation.
//!
//! # Overview
//!
//! - One trait per collaborator ([`LabwareRepo`], [`SlotRepo`], [`PlanRepo`], ...)
//! - [`ConfirmStore`]: everything the engine reads or writes
//! - [`TransactionalStore`]: all-or-nothing, single-writer transactions
//! - [`StoreSnapshot`]: JSON image for seeding and export
//!
//! # Example
//!
//! ```rust
//! use labtrack_store::{LabwareRepo, MemoryStore, TransactionalStore};
//!
//! let store = MemoryStore::new();
//! let found = store
//!     .transaction(|tx| tx.find_labware_by_barcodes(&["STAN-1".to_string()]))
//!     .unwrap();
//! assert!(found.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod memory;
mod repo;
mod snapshot;

pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTx};
pub use repo::{
    CommentRepo, ConfirmStore, LabwareRepo, MeasurementRepo, OperationRepo, PlanRepo, SampleRepo,
    SlotRepo, TransactionalStore, UserRepo,
};
pub use snapshot::StoreSnapshot;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
