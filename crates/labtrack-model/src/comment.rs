//! Predefined comments and their links to operations

use crate::ids::{CommentId, LabwareId, OperationCommentId, OperationId, SampleId, SlotId};
use serde::{Deserialize, Serialize};

/// Reference-data comment a technician can attach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub category: String,
}

/// Comment attached to a slot (and optionally a sample) by an operation
///
/// `operation_id` is `None` when the labware was discarded instead of
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationComment {
    pub id: OperationCommentId,
    pub comment: Comment,
    pub operation_id: Option<OperationId>,
    pub sample_id: Option<SampleId>,
    pub labware_id: LabwareId,
    pub slot_id: SlotId,
}

/// Operation comment before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOperationComment {
    pub comment: Comment,
    pub operation_id: Option<OperationId>,
    pub sample_id: Option<SampleId>,
    pub labware_id: LabwareId,
    pub slot_id: SlotId,
}
