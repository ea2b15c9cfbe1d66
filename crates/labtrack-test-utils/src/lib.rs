//! Testing utilities for the labtrack workspace
//!
//! [`LabFixture`] builds a [`StoreSnapshot`] from blocks, destination labware,
//! comments and plans, then hands out a seeded [`MemoryStore`].

#![allow(missing_docs)]

use labtrack_model::{
    Address, BioStateId, Comment, CommentId, Labware, LabwareId, LabwareType, OperationType,
    OperationTypeId, Plan, PlanActionId, PlanId, PlannedAction, Sample, SampleId, Slot, SlotId,
    TissueId, User, UserId,
};
use labtrack_store::{MemoryStore, StoreSnapshot};

/// Bio-state given to fixture blocks
pub const TISSUE_BIO_STATE: BioStateId = BioStateId(1);

/// Registered block: a one-slot labware holding one block sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub labware_id: LabwareId,
    pub barcode: String,
    pub slot_id: SlotId,
    pub sample: Sample,
}

/// One planned action to add with [`LabFixture::plan`]
#[derive(Debug, Clone)]
pub struct PlanStep {
    source_slot_id: SlotId,
    sample: Sample,
    destination: LabwareId,
    address: Address,
    section: Option<i32>,
    bio_state: Option<BioStateId>,
    thickness: Option<u32>,
}

impl PlanStep {
    pub fn new(block: &BlockRef, destination: LabwareId, address: &str) -> Self {
        Self {
            source_slot_id: block.slot_id,
            sample: block.sample.clone(),
            destination,
            address: addr(address),
            section: None,
            bio_state: None,
            thickness: None,
        }
    }

    pub fn section(mut self, section: i32) -> Self {
        self.section = Some(section);
        self
    }

    pub fn bio_state(mut self, bio_state: BioStateId) -> Self {
        self.bio_state = Some(bio_state);
        self
    }

    pub fn thickness(mut self, thickness: u32) -> Self {
        self.thickness = Some(thickness);
        self
    }
}

/// Parse an address, panicking on bad input
pub fn addr(text: &str) -> Address {
    text.parse().unwrap()
}

/// Snapshot builder with a shared id counter
#[derive(Debug, Clone)]
pub struct LabFixture {
    snapshot: StoreSnapshot,
    next_id: u64,
}

impl Default for LabFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl LabFixture {
    /// Fixture with user `tech` and operation type `Section`
    pub fn new() -> Self {
        let snapshot = StoreSnapshot {
            users: vec![User {
                id: UserId(1),
                username: "tech".into(),
            }],
            operation_types: vec![OperationType {
                id: OperationTypeId(1),
                name: "Section".into(),
            }],
            ..StoreSnapshot::default()
        };
        Self {
            snapshot,
            next_id: 100,
        }
    }

    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn user(&self) -> User {
        self.snapshot.users[0].clone()
    }

    pub fn operation_type(&self) -> OperationType {
        self.snapshot.operation_types[0].clone()
    }

    /// Block labware holding one unsectioned sample
    pub fn block(&mut self, barcode: &str, watermark: Option<i32>) -> BlockRef {
        let labware_id = LabwareId(self.id());
        let slot_id = SlotId(self.id());
        let sample = Sample {
            id: SampleId(self.id()),
            section: None,
            tissue_id: TissueId(self.id()),
            bio_state: TISSUE_BIO_STATE,
        };
        self.snapshot.labware.push(Labware {
            id: labware_id,
            barcode: barcode.into(),
            labware_type: LabwareType::new("Proviasette", 1, 1),
            slots: vec![Slot {
                id: slot_id,
                labware_id,
                address: addr("A1"),
                samples: vec![sample.clone()],
                block_sample_id: Some(sample.id),
                block_highest_section: watermark,
            }],
            discarded: false,
            destroyed: false,
            released: false,
            used: true,
        });
        BlockRef {
            labware_id,
            barcode: barcode.into(),
            slot_id,
            sample,
        }
    }

    /// Empty destination labware
    pub fn labware(&mut self, barcode: &str, rows: u8, columns: u8) -> LabwareId {
        let labware_id = LabwareId(self.id());
        let labware_type = LabwareType::new(format!("{rows}x{columns}"), rows, columns);
        let addresses: Vec<Address> = labware_type.addresses().collect();
        let slots = addresses
            .into_iter()
            .map(|address| Slot {
                id: SlotId(self.id()),
                labware_id,
                address,
                samples: Vec::new(),
                block_sample_id: None,
                block_highest_section: None,
            })
            .collect();
        self.snapshot.labware.push(Labware {
            id: labware_id,
            barcode: barcode.into(),
            labware_type,
            slots,
            discarded: false,
            destroyed: false,
            released: false,
            used: false,
        });
        labware_id
    }

    /// Mutable access to seeded labware, e.g. to set flags
    pub fn labware_mut(&mut self, id: LabwareId) -> &mut Labware {
        self.snapshot
            .labware
            .iter_mut()
            .find(|lw| lw.id == id)
            .unwrap()
    }

    pub fn comment(&mut self, text: &str) -> CommentId {
        let id = CommentId(self.id());
        self.snapshot.comments.push(Comment {
            id,
            text: text.into(),
            category: "section".into(),
        });
        id
    }

    pub fn plan(&mut self, steps: Vec<PlanStep>) -> PlanId {
        let plan_id = PlanId(self.id());
        let actions = steps
            .into_iter()
            .map(|step| PlannedAction {
                id: PlanActionId(self.id()),
                plan_id,
                source_slot_id: step.source_slot_id,
                destination_labware_id: step.destination,
                destination_address: step.address,
                sample: step.sample,
                new_section: step.section,
                new_bio_state: step.bio_state,
                thickness: step.thickness,
            })
            .collect();
        self.snapshot.plans.push(Plan {
            id: plan_id,
            operation_type: self.operation_type(),
            user: self.user(),
            actions,
        });
        plan_id
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    pub fn store(&self) -> MemoryStore {
        MemoryStore::from_snapshot(self.snapshot.clone()).unwrap()
    }
}

/// Scenario fixture: one block and a 1x2 rack planned to receive three sections
///
/// Actions go A1, A1, A2 with planned sections 1, 2, 3.
#[derive(Debug, Clone)]
pub struct RackScenario {
    pub fixture: LabFixture,
    pub block: BlockRef,
    pub rack: LabwareId,
    pub plan: PlanId,
}

impl RackScenario {
    pub fn new(watermark: Option<i32>) -> Self {
        let mut fixture = LabFixture::new();
        let block = fixture.block("BLOCK-1", watermark);
        let rack = fixture.labware("RACK-1", 1, 2);
        let plan = fixture.plan(vec![
            PlanStep::new(&block, rack, "A1").section(1),
            PlanStep::new(&block, rack, "A1").section(2),
            PlanStep::new(&block, rack, "A2").section(3),
        ]);
        Self {
            fixture,
            block,
            rack,
            plan,
        }
    }
}
