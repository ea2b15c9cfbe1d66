//! Plans recorded ahead of an operation

use crate::address::Address;
use crate::ids::{BioStateId, LabwareId, PlanActionId, PlanId, SlotId};
use crate::operation::{OperationType, User};
use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Pre-declared description of source to destination movement
///
/// Plans are created by an earlier planning workflow and are read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub operation_type: OperationType,
    pub user: User,
    pub actions: Vec<PlannedAction>,
}

impl Plan {
    /// Actions destined for one labware
    pub fn actions_into(&self, labware_id: LabwareId) -> impl Iterator<Item = &PlannedAction> {
        self.actions
            .iter()
            .filter(move |action| action.destination_labware_id == labware_id)
    }
}

/// One intended movement of a source sample into a destination slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub id: PlanActionId,
    pub plan_id: PlanId,
    pub source_slot_id: SlotId,
    pub destination_labware_id: LabwareId,
    pub destination_address: Address,
    /// Source sample
    pub sample: Sample,
    #[serde(default)]
    pub new_section: Option<i32>,
    #[serde(default)]
    pub new_bio_state: Option<BioStateId>,
    /// Planned thickness, recorded as a measurement on confirmation
    #[serde(default)]
    pub thickness: Option<u32>,
}
