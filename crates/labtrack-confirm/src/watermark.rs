//! Source-block watermark updater
//!
//! Runs once per request, after every operation exists. Actions are grouped
//! by source slot id, never by in-memory identity.

use labtrack_model::{Operation, SampleId, SlotId};
use labtrack_store::{SlotRepo, StoreError};
use std::collections::{BTreeMap, HashMap};

/// Watermark change applied to one block slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkRaise {
    pub slot_id: SlotId,
    /// Value read before the raise
    pub previous: Option<i32>,
    /// Highest section produced from the block in this request
    pub requested: i32,
    /// Value stored afterwards
    pub stored: i32,
}

/// Raise the watermark of every block slot the operations cut from
///
/// A slot is only touched when it is the block of the source sample and
/// the highest produced section exceeds its stored value.
///
/// # Errors
/// Returns error if a slot cannot be read or written
pub fn raise_watermarks<R: SlotRepo + ?Sized>(
    store: &mut R,
    operations: &[Operation],
) -> Result<Vec<WatermarkRaise>, StoreError> {
    let mut highest: BTreeMap<SlotId, HashMap<SampleId, i32>> = BTreeMap::new();
    for action in operations.iter().flat_map(|op| &op.actions) {
        if action.sample.id == action.source_sample.id {
            continue;
        }
        let Some(section) = action.sample.section else {
            continue;
        };
        let max = highest
            .entry(action.source_slot_id)
            .or_default()
            .entry(action.source_sample.id)
            .or_insert(section);
        *max = (*max).max(section);
    }
    if highest.is_empty() {
        return Ok(Vec::new());
    }

    let slot_ids: Vec<SlotId> = highest.keys().copied().collect();
    let slots = store.find_slots(&slot_ids)?;

    let mut raises = Vec::new();
    for slot in slots {
        let Some(by_sample) = highest.get(&slot.id) else {
            continue;
        };
        let Some(requested) = by_sample
            .iter()
            .filter(|(sample_id, _)| slot.is_block_of(**sample_id))
            .map(|(_, section)| *section)
            .max()
        else {
            continue;
        };
        if slot.block_highest_section.is_some_and(|current| current >= requested) {
            continue;
        }
        let stored = store.raise_block_watermark(slot.id, requested)?;
        tracing::debug!(slot = %slot.id, previous = ?slot.block_highest_section, requested, stored, "block watermark raised");
        raises.push(WatermarkRaise {
            slot_id: slot.id,
            previous: slot.block_highest_section,
            requested,
            stored,
        });
    }
    Ok(raises)
}
