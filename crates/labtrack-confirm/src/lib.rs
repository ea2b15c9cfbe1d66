//! Labtrack Confirm
//!
//! Reconciles what a technician reports against the plan recorded before an
//! operation: derives or reuses sample identities, fills destination slots,
//! creates one operation per labware, records measurements and comments, and
//! keeps each source block's highest-section watermark.
//!
//! # Pipeline
//!
//! 1. [`ConfirmValidator`]: every check up front, all problems reported together
//! 2. [`ConfirmExecutor`]: per labware, discard or confirm
//! 3. [`raise_watermarks`]: one pass over all created operations
//! 4. [`record_comments`]: per labware, after contents are final
//!
//! [`ConfirmEngine`] runs the pipeline in one store transaction. The parts
//! that differ between sectioning and general confirmation are a
//! [`ConfirmStrategy`].
//!
//! # Example
//!
//! ```rust
//! use labtrack_confirm::{ConfirmEngine, PlannedStrategy, Problem};
//! use labtrack_model::{ConfirmLabware, ConfirmationRequest};
//! use labtrack_store::MemoryStore;
//!
//! let engine = ConfirmEngine::new(PlannedStrategy);
//! let store = MemoryStore::new();
//! let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelled("STAN-1")]);
//!
//! let problems = engine.check(&store, &request).unwrap();
//! assert_eq!(problems, vec![Problem::UnknownBarcode("STAN-1".into())]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod comments;
mod config;
mod deriver;
mod engine;
mod error;
mod executor;
mod plan_index;
mod strategy;
mod surviving;
mod validator;
mod watermark;

pub use comments::record_comments;
pub use config::{ConfigError, ConfirmConfig};
pub use deriver::{Derivation, SampleDeriver};
pub use engine::ConfirmEngine;
pub use error::{ConfirmError, IntegrityError, Problem};
pub use executor::{ConfirmExecutor, LabwareOutcome};
pub use plan_index::{ActionKey, PlanIndex};
pub use strategy::{ConfirmStrategy, DerivationTarget, PlannedStrategy, SectionStrategy};
pub use surviving::{surviving_actions, SurvivingAction};
pub use validator::{ConfirmValidator, ValidatedLabware, ValidatedRequest};
pub use watermark::{raise_watermarks, WatermarkRaise};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
