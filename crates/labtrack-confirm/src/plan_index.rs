//! Plan index
//!
//! Indexes the planned actions of each labware's matched plan by
//! [`ActionKey`]. A slot may receive several source samples, so the address
//! alone is not a key. Several sections cut from one block into one slot share
//! a key; all of them are kept.

use indexmap::IndexMap;
use labtrack_model::{Address, LabwareId, Plan, PlanActionId, PlannedAction, SampleId};
use std::collections::HashMap;
use std::fmt;

/// Destination address plus source sample id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionKey {
    pub address: Address,
    pub sample_id: SampleId,
}

impl ActionKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(address: Address, sample_id: SampleId) -> Self {
        Self { address, sample_id }
    }

    /// Key of a planned action
    #[inline]
    #[must_use]
    pub fn of(action: &PlannedAction) -> Self {
        Self::new(action.destination_address, action.sample.id)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.sample_id)
    }
}

/// Planned actions per destination labware, grouped by key in first-seen order
#[derive(Debug, Clone, Default)]
pub struct PlanIndex {
    by_labware: HashMap<LabwareId, IndexMap<ActionKey, Vec<PlannedAction>>>,
}

impl PlanIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the actions of `plan` destined for `labware_id`
    ///
    /// Returns the number of actions indexed.
    pub fn insert_plan(&mut self, labware_id: LabwareId, plan: &Plan) -> usize {
        let entry = self.by_labware.entry(labware_id).or_default();
        let mut count = 0;
        for action in plan.actions_into(labware_id) {
            entry
                .entry(ActionKey::of(action))
                .or_default()
                .push(action.clone());
            count += 1;
        }
        count
    }

    /// First planned action for a key
    #[must_use]
    pub fn get(&self, labware_id: LabwareId, key: &ActionKey) -> Option<&PlannedAction> {
        self.matching(labware_id, key).first()
    }

    /// Planned action by key and id
    #[must_use]
    pub fn find(
        &self,
        labware_id: LabwareId,
        key: &ActionKey,
        id: PlanActionId,
    ) -> Option<&PlannedAction> {
        self.matching(labware_id, key).iter().find(|a| a.id == id)
    }

    /// Every planned action sharing a key
    #[must_use]
    pub fn matching(&self, labware_id: LabwareId, key: &ActionKey) -> &[PlannedAction] {
        self.by_labware
            .get(&labware_id)
            .and_then(|actions| actions.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the labware has been indexed
    #[inline]
    #[must_use]
    pub fn contains_labware(&self, labware_id: LabwareId) -> bool {
        self.by_labware.contains_key(&labware_id)
    }

    /// Planned actions into one labware
    pub fn actions(&self, labware_id: LabwareId) -> impl Iterator<Item = &PlannedAction> {
        self.by_labware
            .get(&labware_id)
            .into_iter()
            .flat_map(IndexMap::values)
            .flatten()
    }
}
