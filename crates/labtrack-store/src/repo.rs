//! Repository traits consumed by the confirmation engine
//!
//! One trait per collaborator. [`ConfirmStore`] bundles the ones the engine
//! needs; [`TransactionalStore`] opens the single-writer transaction every
//! confirmation runs in.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use labtrack_model::{
    Comment, CommentId, Labware, LabwareId, Measurement, NewMeasurement, NewOperation,
    NewOperationComment, NewSample, Operation, OperationComment, OperationId, Plan, Sample,
    SampleId, Slot, SlotId, User,
};

/// Labware lookup and lifecycle flags
pub trait LabwareRepo {
    /// Labware whose barcode is in `barcodes`; unknown barcodes are skipped
    fn find_labware_by_barcodes(&self, barcodes: &[String]) -> Result<Vec<Labware>, StoreError>;

    /// Current persisted state of one labware
    ///
    /// Also serves as the refresh hook after slot contents were saved.
    fn find_labware(&self, id: LabwareId) -> Result<Labware, StoreError>;

    /// Flag labware as discarded and return its refreshed state
    fn mark_discarded(&mut self, id: LabwareId) -> Result<Labware, StoreError>;
}

/// Slot contents and block watermarks
pub trait SlotRepo {
    /// Slots with the given ids; unknown ids are skipped
    fn find_slots(&self, ids: &[SlotId]) -> Result<Vec<Slot>, StoreError>;

    /// Replace the samples held by a slot
    fn save_slot_contents(&mut self, slot_id: SlotId, samples: &[SampleId])
        -> Result<(), StoreError>;

    /// Raise the block watermark of a slot to at least `section`
    ///
    /// Compare-and-set: the stored value never decreases. Returns the value
    /// stored afterwards.
    fn raise_block_watermark(&mut self, slot_id: SlotId, section: i32) -> Result<i32, StoreError>;
}

/// Sample creation
pub trait SampleRepo {
    /// Persist a new sample row
    fn create_sample(&mut self, sample: NewSample) -> Result<Sample, StoreError>;
}

/// Plan lookup
pub trait PlanRepo {
    /// Every plan with at least one action into one of the labware
    fn find_plans_for_labware(&self, labware_ids: &[LabwareId]) -> Result<Vec<Plan>, StoreError>;
}

/// Operation persistence
pub trait OperationRepo {
    /// Persist an operation with its actions; performed defaults to now
    fn create_operation(&mut self, operation: NewOperation) -> Result<Operation, StoreError>;

    /// Overwrite the performed time of an operation
    fn set_operation_performed(
        &mut self,
        id: OperationId,
        performed: DateTime<Utc>,
    ) -> Result<Operation, StoreError>;
}

/// Measurement persistence
pub trait MeasurementRepo {
    /// Persist measurements in one batch
    fn save_measurements(
        &mut self,
        measurements: Vec<NewMeasurement>,
    ) -> Result<Vec<Measurement>, StoreError>;
}

/// Comment lookup and operation-comment persistence
pub trait CommentRepo {
    /// Comments with the given ids; unknown ids are skipped
    fn find_comments(&self, ids: &[CommentId]) -> Result<Vec<Comment>, StoreError>;

    /// Persist operation-comment links in one batch
    fn save_operation_comments(
        &mut self,
        comments: Vec<NewOperationComment>,
    ) -> Result<Vec<OperationComment>, StoreError>;
}

/// User lookup
pub trait UserRepo {
    /// User by username
    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Everything the confirmation engine reads or writes
pub trait ConfirmStore:
    LabwareRepo + SlotRepo + SampleRepo + PlanRepo + OperationRepo + MeasurementRepo + CommentRepo
{
}

impl<T> ConfirmStore for T where
    T: LabwareRepo
        + SlotRepo
        + SampleRepo
        + PlanRepo
        + OperationRepo
        + MeasurementRepo
        + CommentRepo
{
}

/// Store that can run a closure inside one all-or-nothing transaction
///
/// Implementations must give serializable isolation: two transactions that
/// read and then write the same labware or block must not both commit on the
/// strength of the same read.
pub trait TransactionalStore {
    /// Transaction handle
    type Tx: ConfirmStore;

    /// Run `f`; commit on `Ok`, roll back on `Err`
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<StoreError>;
}
