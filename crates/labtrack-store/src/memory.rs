//! In-memory transactional store
//!
//! [`MemoryStore`] keeps normalised tables behind a single mutex. A
//! transaction holds the lock from start to finish and works on an owned copy
//! of the tables, which replaces the committed copy only when the closure
//! succeeds. Transactions are therefore serialised and all-or-nothing.

use crate::error::StoreError;
use crate::repo::{
    CommentRepo, LabwareRepo, MeasurementRepo, OperationRepo, PlanRepo, SampleRepo, SlotRepo,
    TransactionalStore, UserRepo,
};
use crate::snapshot::StoreSnapshot;
use chrono::{DateTime, Utc};
use labtrack_model::{
    Action, ActionId, Address, Comment, CommentId, Labware, LabwareId, LabwareType, Measurement,
    MeasurementId, NewMeasurement, NewOperation, NewOperationComment, NewSample, Operation,
    OperationComment, OperationCommentId, OperationId, OperationType, OperationTypeId, Plan,
    PlanId, Sample, SampleId, Slot, SlotId, User, UserId,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone)]
struct LabwareRow {
    id: LabwareId,
    barcode: String,
    labware_type: LabwareType,
    slot_ids: Vec<SlotId>,
    discarded: bool,
    destroyed: bool,
    released: bool,
    used: bool,
}

#[derive(Debug, Clone)]
struct SlotRow {
    id: SlotId,
    labware_id: LabwareId,
    address: Address,
    sample_ids: Vec<SampleId>,
    block_sample_id: Option<SampleId>,
    block_highest_section: Option<i32>,
}

/// Last issued id per generated table
#[derive(Debug, Clone, Default)]
struct Sequences {
    sample: u64,
    operation: u64,
    action: u64,
    measurement: u64,
    operation_comment: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    operation_types: BTreeMap<OperationTypeId, OperationType>,
    comments: BTreeMap<CommentId, Comment>,
    samples: BTreeMap<SampleId, Sample>,
    labware: BTreeMap<LabwareId, LabwareRow>,
    barcodes: HashMap<String, LabwareId>,
    slots: BTreeMap<SlotId, SlotRow>,
    plans: BTreeMap<PlanId, Plan>,
    operations: BTreeMap<OperationId, Operation>,
    measurements: Vec<Measurement>,
    operation_comments: Vec<OperationComment>,
    seq: Sequences,
}

impl Tables {
    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut tables = Self::default();

        for user in snapshot.users {
            if tables.users.insert(user.id, user.clone()).is_some() {
                return Err(StoreError::DuplicateId {
                    table: "user",
                    id: user.id.get(),
                });
            }
        }
        for op_type in snapshot.operation_types {
            tables.operation_types.insert(op_type.id, op_type);
        }
        for comment in snapshot.comments {
            if tables.comments.insert(comment.id, comment.clone()).is_some() {
                return Err(StoreError::DuplicateId {
                    table: "comment",
                    id: comment.id.get(),
                });
            }
        }
        for sample in &snapshot.samples {
            tables.register_sample(sample);
        }

        for labware in snapshot.labware {
            tables.insert_labware(labware)?;
        }

        for plan in snapshot.plans {
            for action in &plan.actions {
                tables.register_sample(&action.sample);
            }
            if tables.plans.insert(plan.id, plan.clone()).is_some() {
                return Err(StoreError::DuplicateId {
                    table: "plan",
                    id: plan.id.get(),
                });
            }
        }

        for operation in snapshot.operations {
            for action in &operation.actions {
                tables.register_sample(&action.sample);
                tables.register_sample(&action.source_sample);
                tables.seq.action = tables.seq.action.max(action.id.get());
            }
            tables.seq.operation = tables.seq.operation.max(operation.id.get());
            tables.operations.insert(operation.id, operation);
        }

        for measurement in &snapshot.measurements {
            tables.seq.measurement = tables.seq.measurement.max(measurement.id.get());
        }
        tables.measurements = snapshot.measurements;

        for link in &snapshot.operation_comments {
            tables.seq.operation_comment = tables.seq.operation_comment.max(link.id.get());
        }
        tables.operation_comments = snapshot.operation_comments;

        tables.seq.sample = tables.samples.keys().last().map_or(0, |id| id.get());

        Ok(tables)
    }

    fn insert_labware(&mut self, labware: Labware) -> Result<(), StoreError> {
        if self.labware.contains_key(&labware.id) {
            return Err(StoreError::DuplicateId {
                table: "labware",
                id: labware.id.get(),
            });
        }
        if self.barcodes.contains_key(&labware.barcode) {
            return Err(StoreError::DuplicateBarcode(labware.barcode));
        }

        let mut slot_ids = Vec::with_capacity(labware.slots.len());
        for slot in labware.slots {
            for sample in &slot.samples {
                self.register_sample(sample);
            }
            slot_ids.push(slot.id);
            let row = SlotRow {
                id: slot.id,
                labware_id: labware.id,
                address: slot.address,
                sample_ids: slot.samples.iter().map(|s| s.id).collect(),
                block_sample_id: slot.block_sample_id,
                block_highest_section: slot.block_highest_section,
            };
            if self.slots.insert(slot.id, row).is_some() {
                return Err(StoreError::DuplicateId {
                    table: "slot",
                    id: slot.id.get(),
                });
            }
        }

        self.barcodes.insert(labware.barcode.clone(), labware.id);
        self.labware.insert(
            labware.id,
            LabwareRow {
                id: labware.id,
                barcode: labware.barcode,
                labware_type: labware.labware_type,
                slot_ids,
                discarded: labware.discarded,
                destroyed: labware.destroyed,
                released: labware.released,
                used: labware.used,
            },
        );
        Ok(())
    }

    fn register_sample(&mut self, sample: &Sample) {
        self.samples
            .entry(sample.id)
            .or_insert_with(|| sample.clone());
    }

    fn sample(&self, id: SampleId) -> Result<&Sample, StoreError> {
        self.samples
            .get(&id)
            .ok_or_else(|| StoreError::unknown("sample", id.get()))
    }

    fn hydrate_slot(&self, row: &SlotRow) -> Result<Slot, StoreError> {
        let samples = row
            .sample_ids
            .iter()
            .map(|id| self.sample(*id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Slot {
            id: row.id,
            labware_id: row.labware_id,
            address: row.address,
            samples,
            block_sample_id: row.block_sample_id,
            block_highest_section: row.block_highest_section,
        })
    }

    fn hydrate_labware(&self, row: &LabwareRow) -> Result<Labware, StoreError> {
        let slots = row
            .slot_ids
            .iter()
            .map(|id| {
                self.slots
                    .get(id)
                    .ok_or_else(|| StoreError::unknown("slot", id.get()))
                    .and_then(|slot| self.hydrate_slot(slot))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Labware {
            id: row.id,
            barcode: row.barcode.clone(),
            labware_type: row.labware_type.clone(),
            slots,
            discarded: row.discarded,
            destroyed: row.destroyed,
            released: row.released,
            used: row.used,
        })
    }

    fn labware(&self, id: LabwareId) -> Result<Labware, StoreError> {
        let row = self
            .labware
            .get(&id)
            .ok_or_else(|| StoreError::unknown("labware", id.get()))?;
        self.hydrate_labware(row)
    }

    fn to_snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let labware = self
            .labware
            .values()
            .map(|row| self.hydrate_labware(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StoreSnapshot {
            users: self.users.values().cloned().collect(),
            operation_types: self.operation_types.values().cloned().collect(),
            comments: self.comments.values().cloned().collect(),
            samples: self.samples.values().cloned().collect(),
            labware,
            plans: self.plans.values().cloned().collect(),
            operations: self.operations.values().cloned().collect(),
            measurements: self.measurements.clone(),
            operation_comments: self.operation_comments.clone(),
        })
    }
}

/// Serialised, all-or-nothing in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a snapshot
    ///
    /// # Errors
    /// Returns error on duplicate ids or barcodes
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        Ok(Self {
            tables: Mutex::new(Tables::from_snapshot(snapshot)?),
        })
    }

    /// Seed a store from a snapshot file
    ///
    /// # Errors
    /// Returns error on IO failure, malformed JSON or inconsistent data
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_snapshot(StoreSnapshot::read(path)?)
    }

    /// Export the committed state
    ///
    /// # Errors
    /// Returns error if a slot references a missing sample
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        self.tables.lock().to_snapshot()
    }

    /// Committed state of labware with the given barcode
    ///
    /// # Errors
    /// Returns error if a slot references a missing sample
    pub fn labware_by_barcode(&self, barcode: &str) -> Result<Option<Labware>, StoreError> {
        let tables = self.tables.lock();
        match tables.barcodes.get(barcode) {
            Some(id) => tables.labware(*id).map(Some),
            None => Ok(None),
        }
    }

    /// Committed state of one slot
    ///
    /// # Errors
    /// Returns error if the slot references a missing sample
    pub fn slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError> {
        let tables = self.tables.lock();
        tables
            .slots
            .get(&id)
            .map(|row| tables.hydrate_slot(row))
            .transpose()
    }

    /// All committed operations, by id
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.tables.lock().operations.values().cloned().collect()
    }

    /// All committed measurements
    #[must_use]
    pub fn measurements(&self) -> Vec<Measurement> {
        self.tables.lock().measurements.clone()
    }

    /// All committed operation comments
    #[must_use]
    pub fn operation_comments(&self) -> Vec<OperationComment> {
        self.tables.lock().operation_comments.clone()
    }

    /// All committed samples, by id
    #[must_use]
    pub fn samples(&self) -> Vec<Sample> {
        self.tables.lock().samples.values().cloned().collect()
    }

    /// Remove a comment from reference data
    pub fn delete_comment(&self, id: CommentId) -> Option<Comment> {
        self.tables.lock().comments.remove(&id)
    }
}

impl TransactionalStore for MemoryStore {
    type Tx = MemoryTx;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.tables.lock();
        let mut tx = MemoryTx {
            tables: committed.clone(),
        };
        match f(&mut tx) {
            Ok(value) => {
                *committed = tx.tables;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("transaction rolled back");
                Err(err)
            }
        }
    }
}

/// Working copy of the tables inside one transaction
#[derive(Debug)]
pub struct MemoryTx {
    tables: Tables,
}

impl LabwareRepo for MemoryTx {
    fn find_labware_by_barcodes(&self, barcodes: &[String]) -> Result<Vec<Labware>, StoreError> {
        let mut found = Vec::new();
        for barcode in barcodes {
            if let Some(id) = self.tables.barcodes.get(barcode) {
                found.push(self.tables.labware(*id)?);
            }
        }
        Ok(found)
    }

    fn find_labware(&self, id: LabwareId) -> Result<Labware, StoreError> {
        self.tables.labware(id)
    }

    fn mark_discarded(&mut self, id: LabwareId) -> Result<Labware, StoreError> {
        let row = self
            .tables
            .labware
            .get_mut(&id)
            .ok_or_else(|| StoreError::unknown("labware", id.get()))?;
        row.discarded = true;
        self.tables.labware(id)
    }
}

impl SlotRepo for MemoryTx {
    fn find_slots(&self, ids: &[SlotId]) -> Result<Vec<Slot>, StoreError> {
        ids.iter()
            .filter_map(|id| self.tables.slots.get(id))
            .map(|row| self.tables.hydrate_slot(row))
            .collect()
    }

    fn save_slot_contents(
        &mut self,
        slot_id: SlotId,
        samples: &[SampleId],
    ) -> Result<(), StoreError> {
        for id in samples {
            self.tables.sample(*id)?;
        }
        let row = self
            .tables
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| StoreError::unknown("slot", slot_id.get()))?;
        row.sample_ids = samples.to_vec();
        Ok(())
    }

    fn raise_block_watermark(&mut self, slot_id: SlotId, section: i32) -> Result<i32, StoreError> {
        let row = self
            .tables
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| StoreError::unknown("slot", slot_id.get()))?;
        let raised = row
            .block_highest_section
            .map_or(section, |current| current.max(section));
        row.block_highest_section = Some(raised);
        Ok(raised)
    }
}

impl SampleRepo for MemoryTx {
    fn create_sample(&mut self, sample: NewSample) -> Result<Sample, StoreError> {
        let id = SampleId(next(&mut self.tables.seq.sample));
        let sample = Sample {
            id,
            section: sample.section,
            tissue_id: sample.tissue_id,
            bio_state: sample.bio_state,
        };
        self.tables.samples.insert(id, sample.clone());
        Ok(sample)
    }
}

impl PlanRepo for MemoryTx {
    fn find_plans_for_labware(&self, labware_ids: &[LabwareId]) -> Result<Vec<Plan>, StoreError> {
        Ok(self
            .tables
            .plans
            .values()
            .filter(|plan| {
                plan.actions
                    .iter()
                    .any(|action| labware_ids.contains(&action.destination_labware_id))
            })
            .cloned()
            .collect())
    }
}

impl OperationRepo for MemoryTx {
    fn create_operation(&mut self, operation: NewOperation) -> Result<Operation, StoreError> {
        let id = OperationId(next(&mut self.tables.seq.operation));
        let mut actions = Vec::with_capacity(operation.actions.len());
        for action in operation.actions {
            for slot_id in [action.source_slot_id, action.destination_slot_id] {
                if !self.tables.slots.contains_key(&slot_id) {
                    return Err(StoreError::unknown("slot", slot_id.get()));
                }
            }
            actions.push(Action {
                id: ActionId(next(&mut self.tables.seq.action)),
                operation_id: id,
                source_slot_id: action.source_slot_id,
                destination_slot_id: action.destination_slot_id,
                sample: action.sample,
                source_sample: action.source_sample,
            });
        }
        let operation = Operation {
            id,
            operation_type: operation.operation_type,
            performed: Utc::now(),
            actions,
            user: operation.user,
            plan_id: operation.plan_id,
        };
        self.tables.operations.insert(id, operation.clone());
        Ok(operation)
    }

    fn set_operation_performed(
        &mut self,
        id: OperationId,
        performed: DateTime<Utc>,
    ) -> Result<Operation, StoreError> {
        let operation = self
            .tables
            .operations
            .get_mut(&id)
            .ok_or_else(|| StoreError::unknown("operation", id.get()))?;
        operation.performed = performed;
        Ok(operation.clone())
    }
}

impl MeasurementRepo for MemoryTx {
    fn save_measurements(
        &mut self,
        measurements: Vec<NewMeasurement>,
    ) -> Result<Vec<Measurement>, StoreError> {
        let mut saved = Vec::with_capacity(measurements.len());
        for m in measurements {
            let measurement = Measurement {
                id: MeasurementId(next(&mut self.tables.seq.measurement)),
                name: m.name,
                value: m.value,
                sample_id: m.sample_id,
                operation_id: m.operation_id,
                slot_id: m.slot_id,
            };
            self.tables.measurements.push(measurement.clone());
            saved.push(measurement);
        }
        Ok(saved)
    }
}

impl CommentRepo for MemoryTx {
    fn find_comments(&self, ids: &[CommentId]) -> Result<Vec<Comment>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.tables.comments.get(id))
            .cloned()
            .collect())
    }

    fn save_operation_comments(
        &mut self,
        comments: Vec<NewOperationComment>,
    ) -> Result<Vec<OperationComment>, StoreError> {
        let mut saved = Vec::with_capacity(comments.len());
        for c in comments {
            let link = OperationComment {
                id: OperationCommentId(next(&mut self.tables.seq.operation_comment)),
                comment: c.comment,
                operation_id: c.operation_id,
                sample_id: c.sample_id,
                labware_id: c.labware_id,
                slot_id: c.slot_id,
            };
            self.tables.operation_comments.push(link.clone());
            saved.push(link);
        }
        Ok(saved)
    }
}

impl UserRepo for MemoryTx {
    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }
}
