//! Confirmation executor
//!
//! Turns one validated labware into persisted state. No policy checks happen
//! here: a miss against the plan index is an integrity error, not a problem.

use crate::config::ConfirmConfig;
use crate::deriver::SampleDeriver;
use crate::error::{ConfirmError, IntegrityError};
use crate::plan_index::PlanIndex;
use crate::strategy::ConfirmStrategy;
use crate::validator::ValidatedLabware;
use indexmap::IndexMap;
use labtrack_model::{
    Labware, LabwareId, Measurement, NewAction, NewMeasurement, NewOperation, Operation, SampleId,
    SlotId, User,
};
use labtrack_store::{ConfirmStore, StoreError};

/// Result of executing one labware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabwareOutcome {
    /// Created operation; `None` when the labware was discarded
    pub operation: Option<Operation>,
    /// Labware state after the change
    pub labware: Labware,
    pub measurements: Vec<Measurement>,
}

/// Per-labware reconciliation with a request-scoped sample cache
#[derive(Debug)]
pub struct ConfirmExecutor<'a, S: ?Sized> {
    strategy: &'a S,
    config: &'a ConfirmConfig,
    deriver: SampleDeriver,
}

impl<'a, S: ConfirmStrategy + ?Sized> ConfirmExecutor<'a, S> {
    /// Create executor with an empty sample cache
    #[inline]
    #[must_use]
    pub fn new(strategy: &'a S, config: &'a ConfirmConfig) -> Self {
        Self {
            strategy,
            config,
            deriver: SampleDeriver::new(),
        }
    }

    /// Samples derived so far in this request
    #[inline]
    #[must_use]
    pub fn derived(&self) -> usize {
        self.deriver.created()
    }

    /// Execute one validated labware
    ///
    /// # Errors
    /// Returns [`ConfirmError::Integrity`] when the labware disagrees with
    /// the plan index, or [`ConfirmError::Store`] on write failure
    pub fn execute<R: ConfirmStore + ?Sized>(
        &mut self,
        store: &mut R,
        user: &User,
        index: &PlanIndex,
        validated: &ValidatedLabware,
    ) -> Result<LabwareOutcome, ConfirmError> {
        if validated.is_discard() {
            return discard(store, validated.labware());
        }
        self.confirm_labware(store, user, index, validated)
    }

    fn confirm_labware<R: ConfirmStore + ?Sized>(
        &mut self,
        store: &mut R,
        user: &User,
        index: &PlanIndex,
        validated: &ValidatedLabware,
    ) -> Result<LabwareOutcome, ConfirmError> {
        let labware = validated.labware();
        let plan = validated.plan();

        let mut actions = Vec::with_capacity(validated.surviving().len());
        let mut contents: IndexMap<SlotId, Vec<SampleId>> = IndexMap::new();
        let mut thickness: IndexMap<(SampleId, SlotId), u32> = IndexMap::new();

        for surviving in validated.surviving() {
            let planned = index
                .find(labware.id, &surviving.key, surviving.action_id)
                .ok_or_else(|| IntegrityError::UnmatchedAction {
                    barcode: labware.barcode.clone(),
                    address: surviving.key.address,
                    sample_id: surviving.key.sample_id,
                })?;
            let slot = labware
                .slot(surviving.key.address)
                .ok_or_else(|| IntegrityError::MissingSlot {
                    barcode: labware.barcode.clone(),
                    address: surviving.key.address,
                })?;

            let target = self.strategy.target(planned, surviving);
            let derivation = self.deriver.get_or_create(store, &planned.sample, target)?;
            if let (true, Some(value)) = (derivation.is_derived(), planned.thickness) {
                thickness
                    .entry((derivation.sample().id, slot.id))
                    .or_insert(value);
            }
            let sample = derivation.into_sample();

            let held = contents.entry(slot.id).or_default();
            if !held.contains(&sample.id) {
                held.push(sample.id);
            }
            actions.push(NewAction {
                source_slot_id: planned.source_slot_id,
                destination_slot_id: slot.id,
                sample,
                source_sample: planned.sample.clone(),
            });
        }

        for (slot_id, samples) in &contents {
            store.save_slot_contents(*slot_id, samples)?;
        }

        let mut operation = store.create_operation(NewOperation {
            operation_type: plan.operation_type.clone(),
            user: user.clone(),
            actions,
            plan_id: Some(plan.id),
        })?;
        if let Some(performed) = validated.performed() {
            operation = store.set_operation_performed(operation.id, performed)?;
        }

        let measurements = if thickness.is_empty() {
            Vec::new()
        } else {
            let name = &self.config.thickness_measurement_name;
            store.save_measurements(
                thickness
                    .into_iter()
                    .map(|((sample_id, slot_id), value)| NewMeasurement {
                        name: name.clone(),
                        value: value.to_string(),
                        sample_id,
                        operation_id: operation.id,
                        slot_id,
                    })
                    .collect(),
            )?
        };

        let labware = refresh(store, labware.id, &labware.barcode)?;
        tracing::debug!(
            operation = %operation.id,
            actions = operation.actions.len(),
            slots = contents.len(),
            measurements = measurements.len(),
            "labware confirmed"
        );
        Ok(LabwareOutcome {
            operation: Some(operation),
            labware,
            measurements,
        })
    }
}

/// Discard path: flag only, no operation and no slot change
fn discard<R: ConfirmStore + ?Sized>(
    store: &mut R,
    labware: &Labware,
) -> Result<LabwareOutcome, ConfirmError> {
    let labware = store.mark_discarded(labware.id)?;
    tracing::debug!("labware discarded");
    Ok(LabwareOutcome {
        operation: None,
        labware,
        measurements: Vec::new(),
    })
}

/// Reload labware after its contents were saved
fn refresh<R: ConfirmStore + ?Sized>(
    store: &R,
    id: LabwareId,
    barcode: &str,
) -> Result<Labware, ConfirmError> {
    match store.find_labware(id) {
        Ok(labware) => Ok(labware),
        Err(StoreError::UnknownId { .. }) => {
            Err(IntegrityError::UnresolvedLabware(barcode.to_string()).into())
        }
        Err(err) => Err(err.into()),
    }
}
