//! Error types for confirmation
//!
//! Two tiers:
//! - [`Problem`]: user-correctable faults found by validation, reported all
//!   together before anything is written
//! - [`IntegrityError`]: faults that validation should have made impossible,
//!   raised during execution and fatal to the transaction

use chrono::{DateTime, Utc};
use labtrack_model::{Address, CommentId, PlanId, SampleId, SlotId};
use labtrack_store::StoreError;

/// Main confirmation error type
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    /// Request failed validation; nothing was written
    #[error("confirmation rejected: {}", join_problems(.0))]
    Validation(Vec<Problem>),

    /// Execution found a fault validation should have caught
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Underlying store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConfirmError {
    /// Whether the caller can fix the request and resubmit
    #[inline]
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Validation problems, if this is a validation failure
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::Validation(problems) => problems,
            _ => &[],
        }
    }
}

fn join_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_ids(ids: &[CommentId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_plans(ids: &[PlanId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-correctable validation problem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Problem {
    #[error("No labware specified.")]
    NoLabware,

    #[error("Too many labware in one request: {count} (maximum {max}).")]
    TooManyLabware { count: usize, max: usize },

    #[error("Missing labware barcode.")]
    MissingBarcode,

    #[error("Labware barcode given more than once: {0}")]
    DuplicateBarcode(String),

    #[error("Unknown labware barcode: {0}")]
    UnknownBarcode(String),

    #[error("Labware {0} is destroyed.")]
    LabwareDestroyed(String),

    #[error("Labware {0} is released.")]
    LabwareReleased(String),

    #[error("Labware {0} is already discarded.")]
    LabwareDiscarded(String),

    #[error("Labware {0} has already been used.")]
    LabwareUsed(String),

    #[error("Labware {0} already has contents.")]
    LabwareNotEmpty(String),

    #[error("No plan found for labware {0}")]
    NoPlan(String),

    #[error("Multiple plans found for labware {barcode}: {}", join_plans(.plan_ids))]
    MultiplePlans {
        barcode: String,
        plan_ids: Vec<PlanId>,
    },

    #[error("Invalid address {address} for labware {barcode}.")]
    InvalidAddress { barcode: String, address: Address },

    #[error("Sample {sample_id} is not planned into {address} of labware {barcode}.")]
    UnexpectedSample {
        barcode: String,
        address: Address,
        sample_id: SampleId,
    },

    #[error("Sample {sample_id} at {address} of labware {barcode} is listed more times than it was planned.")]
    RepeatedEntry {
        barcode: String,
        address: Address,
        sample_id: SampleId,
    },

    #[error("Cancelled section {given} for sample {sample_id} at {address} of labware {barcode} does not match the planned section {planned:?}.")]
    CancelledSectionMismatch {
        barcode: String,
        address: Address,
        sample_id: SampleId,
        given: i32,
        planned: Option<i32>,
    },

    #[error("Comment {comment_id} for labware {barcode} has no address.")]
    MissingCommentAddress { barcode: String, comment_id: CommentId },

    #[error("Performed time {performed} for labware {barcode} is in the future.")]
    PerformedInFuture {
        barcode: String,
        performed: DateTime<Utc>,
    },

    #[error("Missing section number for sample {sample_id} at {address} of labware {barcode}.")]
    MissingSection {
        barcode: String,
        address: Address,
        sample_id: SampleId,
    },

    #[error("Section number {section} at {address} of labware {barcode} is negative.")]
    NegativeSection {
        barcode: String,
        address: Address,
        section: i32,
    },

    #[error("Section number {section} for sample {sample_id} must be greater than {watermark}, the highest section already taken from the block in slot {slot_id}.")]
    SectionNotAboveWatermark {
        sample_id: SampleId,
        section: i32,
        watermark: i32,
        slot_id: SlotId,
    },

    #[error("Repeated section: {section} from sample {sample_id}.")]
    RepeatedSection { sample_id: SampleId, section: i32 },

    #[error("Unknown comment ids: {}", join_ids(.0))]
    UnknownComments(Vec<CommentId>),
}

/// Fault found during execution that validation should have prevented
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Surviving action has no planned counterpart
    #[error("no planned action for sample {sample_id} into {address} of labware {barcode}")]
    UnmatchedAction {
        barcode: String,
        address: Address,
        sample_id: SampleId,
    },

    /// Address has no slot in the labware
    #[error("labware {barcode} has no slot at {address}")]
    MissingSlot { barcode: String, address: Address },

    /// Comment id did not resolve
    #[error("unknown comment id {0}")]
    UnknownComment(CommentId),

    /// Labware could not be reloaded
    #[error("labware {0} could not be resolved")]
    UnresolvedLabware(String),
}
