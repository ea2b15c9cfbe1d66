//! Labtrack Model
//!
//! Persistence-mapped entities for physical labware and the chain-of-custody
//! operations performed on it.
//!
//! # Core Concepts
//!
//! - [`Labware`] / [`Slot`]: physical containers and their positions
//! - [`Sample`]: immutable lineage rows; a changed sample is a new row
//! - [`Plan`] / [`PlannedAction`]: intended movements declared up front
//! - [`Operation`] / [`Action`]: what was recorded as actually done
//! - [`ConfirmationRequest`] / [`OperationResult`]: confirmation input and output
//!
//! # Example
//!
//! ```rust
//! use labtrack_model::{Address, LabwareType};
//!
//! let rack = LabwareType::new("Tube rack", 1, 2);
//! let a2: Address = "A2".parse().unwrap();
//! assert!(rack.contains(a2));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod comment;
mod ids;
mod labware;
mod operation;
mod plan;
mod request;
mod sample;

pub use address::{Address, AddressError};
pub use comment::{Comment, NewOperationComment, OperationComment};
pub use ids::{
    ActionId, BioStateId, CommentId, LabwareId, MeasurementId, OperationCommentId, OperationId,
    OperationTypeId, PlanActionId, PlanId, SampleId, SlotId, TissueId, UserId,
};
pub use labware::{Labware, LabwareType, Slot};
pub use operation::{
    Action, Measurement, NewAction, NewMeasurement, NewOperation, Operation, OperationType, User,
};
pub use plan::{Plan, PlannedAction};
pub use request::{
    AddressComment, CancelledAction, ConfirmLabware, ConfirmationRequest, ConfirmedSection,
    Disposition, OperationResult,
};
pub use sample::{NewSample, Sample};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
