//! Canonical form of a labware disposition
//!
//! Both list encodings reduce to the planned actions that actually happened.

use crate::plan_index::{ActionKey, PlanIndex};
use labtrack_model::{Disposition, LabwareId, PlanActionId, PlannedAction};
use std::collections::HashSet;

/// Planned action that was carried out, with the section it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurvivingAction {
    pub key: ActionKey,
    pub action_id: PlanActionId,
    pub section: Option<i32>,
}

impl SurvivingAction {
    fn planned(action: &PlannedAction, section: Option<i32>) -> Self {
        Self {
            key: ActionKey::of(action),
            action_id: action.id,
            section,
        }
    }
}

/// Planned action claimed by each list entry, in list order
///
/// Every planned action is claimed at most once. Entries whose section equals
/// a planned section claim first; the rest take the first unclaimed action for
/// their key in plan order. A cancel entry that names a section only claims an
/// action planned with that section. `None` marks an entry with nothing left to
/// claim.
pub(crate) fn claim_entries<'a>(
    disposition: &Disposition,
    labware_id: LabwareId,
    index: &'a PlanIndex,
) -> Vec<Option<&'a PlannedAction>> {
    let (entries, strict): (Vec<(ActionKey, Option<i32>)>, bool) = match disposition {
        Disposition::Cancelled => return Vec::new(),
        Disposition::Confirmed(sections) => (
            sections
                .iter()
                .map(|e| (ActionKey::new(e.address, e.sample_id), e.section))
                .collect(),
            false,
        ),
        Disposition::CancelledActions(cancelled) => (
            cancelled
                .iter()
                .map(|e| (ActionKey::new(e.address, e.sample_id), e.section))
                .collect(),
            true,
        ),
    };

    let mut claimed: HashSet<PlanActionId> = HashSet::new();
    let mut picks: Vec<Option<&PlannedAction>> = vec![None; entries.len()];
    for (pick, (key, section)) in picks.iter_mut().zip(&entries) {
        let Some(section) = section else { continue };
        *pick = index
            .matching(labware_id, key)
            .iter()
            .find(|a| a.new_section == Some(*section) && !claimed.contains(&a.id));
        if let Some(action) = pick {
            claimed.insert(action.id);
        }
    }
    for (pick, (key, section)) in picks.iter_mut().zip(&entries) {
        if pick.is_some() || (strict && section.is_some()) {
            continue;
        }
        *pick = index
            .matching(labware_id, key)
            .iter()
            .find(|a| !claimed.contains(&a.id));
        if let Some(action) = pick {
            claimed.insert(action.id);
        }
    }
    picks
}

/// Surviving actions for one labware
///
/// - `Cancelled`: none
/// - `Confirmed`: the listed entries with their reported sections
/// - `CancelledActions`: every planned action not cancelled, with its planned section
///
/// Entries with nothing to claim are dropped here; the validator reports them.
#[must_use]
pub fn surviving_actions(
    disposition: &Disposition,
    labware_id: LabwareId,
    index: &PlanIndex,
) -> Vec<SurvivingAction> {
    let picks = claim_entries(disposition, labware_id, index);
    match disposition {
        Disposition::Cancelled => Vec::new(),
        Disposition::Confirmed(sections) => sections
            .iter()
            .zip(picks)
            .filter_map(|(entry, planned)| Some(SurvivingAction::planned(planned?, entry.section)))
            .collect(),
        Disposition::CancelledActions(_) => {
            let removed: HashSet<PlanActionId> =
                picks.into_iter().flatten().map(|action| action.id).collect();
            index
                .actions(labware_id)
                .filter(|action| !removed.contains(&action.id))
                .map(|action| SurvivingAction::planned(action, action.new_section))
                .collect()
        }
    }
}
