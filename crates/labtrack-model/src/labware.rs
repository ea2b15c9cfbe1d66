//! Labware, labware types and slots

use crate::address::Address;
use crate::ids::{LabwareId, SampleId, SlotId};
use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Labware layout description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabwareType {
    pub name: String,
    pub rows: u8,
    pub columns: u8,
}

impl LabwareType {
    /// Create a labware type
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, rows: u8, columns: u8) -> Self {
        Self {
            name: name.into(),
            rows,
            columns,
        }
    }

    /// Whether the address lies inside this layout
    #[inline]
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        address.row() <= self.rows && address.column() <= self.columns
    }

    /// Every address in the layout, row-major
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        (1..=self.rows).flat_map(move |row| {
            (1..=self.columns).filter_map(move |column| Address::new(row, column).ok())
        })
    }
}

/// One position in a labware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub labware_id: LabwareId,
    pub address: Address,
    #[serde(default)]
    pub samples: Vec<Sample>,
    /// Sample this slot was registered as a block for
    #[serde(default)]
    pub block_sample_id: Option<SampleId>,
    /// Highest section taken from the block (watermark)
    #[serde(default)]
    pub block_highest_section: Option<i32>,
}

impl Slot {
    /// Whether this slot holds a registered block
    #[inline]
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.block_sample_id.is_some()
    }

    /// Whether this slot is the block for the given sample
    #[inline]
    #[must_use]
    pub fn is_block_of(&self, sample_id: SampleId) -> bool {
        self.block_sample_id == Some(sample_id)
    }
}

/// Aggregate of slots with lifecycle flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labware {
    pub id: LabwareId,
    pub barcode: String,
    pub labware_type: LabwareType,
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub used: bool,
}

impl Labware {
    /// Look up a slot by address
    #[must_use]
    pub fn slot(&self, address: Address) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.address == address)
    }

    /// Whether every slot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.samples.is_empty())
    }

    /// Discarded, destroyed or released labware can no longer be used
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.discarded || self.destroyed || self.released
    }
}
