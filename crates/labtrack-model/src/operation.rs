//! Operations, actions and measurements

use crate::ids::{
    ActionId, MeasurementId, OperationId, OperationTypeId, PlanId, SampleId, SlotId, UserId,
};
use crate::sample::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of operation (e.g. "Section", "Transfer")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationType {
    pub id: OperationTypeId,
    pub name: String,
}

/// Requesting user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Recorded operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub operation_type: OperationType,
    pub performed: DateTime<Utc>,
    pub actions: Vec<Action>,
    pub user: User,
    pub plan_id: Option<PlanId>,
}

/// Movement of one sample from a source slot into a destination slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub operation_id: OperationId,
    pub source_slot_id: SlotId,
    pub destination_slot_id: SlotId,
    /// Produced sample
    pub sample: Sample,
    pub source_sample: Sample,
}

/// Action before it is attached to an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAction {
    pub source_slot_id: SlotId,
    pub destination_slot_id: SlotId,
    pub sample: Sample,
    pub source_sample: Sample,
}

/// Operation before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOperation {
    pub operation_type: OperationType,
    pub user: User,
    pub actions: Vec<NewAction>,
    pub plan_id: Option<PlanId>,
}

/// Named value recorded against a sample in a slot by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,
    pub name: String,
    pub value: String,
    pub sample_id: SampleId,
    pub operation_id: OperationId,
    pub slot_id: SlotId,
}

/// Measurement before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub name: String,
    pub value: String,
    pub sample_id: SampleId,
    pub operation_id: OperationId,
    pub slot_id: SlotId,
}
