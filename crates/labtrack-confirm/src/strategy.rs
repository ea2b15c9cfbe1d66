//! Confirmation strategies
//!
//! Provides the [`ConfirmStrategy`] trait: the part of reconciliation that
//! differs between sectioning and general confirmation. Everything else runs
//! through one engine.

use crate::surviving::SurvivingAction;
use labtrack_model::{BioStateId, PlannedAction};
use std::fmt::Debug;

/// Section and bio-state a produced sample should carry
///
/// `None` keeps the source sample's own value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationTarget {
    pub section: Option<i32>,
    pub bio_state: Option<BioStateId>,
}

/// Policy injected into the confirmation engine
pub trait ConfirmStrategy: Send + Sync + Debug {
    /// Strategy name (for logging)
    fn name(&self) -> &'static str;

    /// Whether surviving actions need a valid, fresh section number
    fn validates_sections(&self) -> bool;

    /// Target identity of the sample produced by a surviving action
    fn target(&self, planned: &PlannedAction, surviving: &SurvivingAction) -> DerivationTarget;
}

/// Sectioning confirmation: the reported section wins over the planned one
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionStrategy;

impl SectionStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmStrategy for SectionStrategy {
    fn name(&self) -> &'static str {
        "Section"
    }

    fn validates_sections(&self) -> bool {
        true
    }

    fn target(&self, planned: &PlannedAction, surviving: &SurvivingAction) -> DerivationTarget {
        DerivationTarget {
            section: surviving.section.or(planned.new_section),
            bio_state: planned.new_bio_state,
        }
    }
}

/// General confirmation: section and bio-state are taken from the plan
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannedStrategy;

impl PlannedStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmStrategy for PlannedStrategy {
    fn name(&self) -> &'static str {
        "Planned"
    }

    fn validates_sections(&self) -> bool {
        false
    }

    fn target(&self, planned: &PlannedAction, _surviving: &SurvivingAction) -> DerivationTarget {
        DerivationTarget {
            section: planned.new_section,
            bio_state: planned.new_bio_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_index::ActionKey;
    use labtrack_model::{LabwareId, PlanActionId, PlanId, Sample, SampleId, SlotId, TissueId};

    fn planned() -> PlannedAction {
        PlannedAction {
            id: PlanActionId(1),
            plan_id: PlanId(1),
            source_slot_id: SlotId(1),
            destination_labware_id: LabwareId(2),
            destination_address: "A1".parse().unwrap(),
            sample: Sample {
                id: SampleId(5),
                section: None,
                tissue_id: TissueId(1),
                bio_state: BioStateId(1),
            },
            new_section: Some(3),
            new_bio_state: Some(BioStateId(2)),
            thickness: None,
        }
    }

    fn surviving(section: Option<i32>) -> SurvivingAction {
        SurvivingAction {
            key: ActionKey::of(&planned()),
            action_id: PlanActionId(1),
            section,
        }
    }

    #[test]
    fn section_strategy_prefers_reported_section() {
        let s = SectionStrategy::new();
        let target = s.target(&planned(), &surviving(Some(7)));
        assert_eq!(target.section, Some(7));
        assert_eq!(target.bio_state, Some(BioStateId(2)));
        assert!(s.validates_sections());
    }

    #[test]
    fn section_strategy_falls_back_to_plan() {
        let target = SectionStrategy::new().target(&planned(), &surviving(None));
        assert_eq!(target.section, Some(3));
    }

    #[test]
    fn planned_strategy_ignores_reported_section() {
        let s = PlannedStrategy::new();
        let target = s.target(&planned(), &surviving(Some(7)));
        assert_eq!(target.section, Some(3));
        assert!(!s.validates_sections());
        assert_eq!(s.name(), "Planned");
    }
}
