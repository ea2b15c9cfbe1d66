//! End-to-end confirmation scenarios against the in-memory store

use labtrack_confirm::{ConfirmEngine, ConfirmError, PlannedStrategy, Problem, SectionStrategy};
use labtrack_model::{
    AddressComment, BioStateId, CancelledAction, ConfirmLabware, ConfirmationRequest,
    ConfirmedSection, SampleId,
};
use labtrack_store::MemoryStore;
use labtrack_test_utils::{addr, LabFixture, PlanStep, RackScenario};
use pretty_assertions::assert_eq;

fn watermark(store: &MemoryStore, scenario: &RackScenario) -> Option<i32> {
    store
        .slot(scenario.block.slot_id)
        .unwrap()
        .unwrap()
        .block_highest_section
}

fn sections(sample: SampleId, entries: &[(&str, i32)]) -> Vec<ConfirmedSection> {
    entries
        .iter()
        .map(|(address, section)| ConfirmedSection::new(addr(address), sample, Some(*section)))
        .collect()
}

#[test]
fn three_sections_into_two_slots() {
    let scenario = RackScenario::new(None);
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let sample = scenario.block.sample.id;
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "RACK-1",
        sections(sample, &[("A1", 1), ("A1", 2), ("A2", 3)]),
    )]);

    let result = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap();

    assert_eq!(result.operations.len(), 1);
    let operation = &result.operations[0];
    assert_eq!(operation.actions.len(), 3);
    assert_eq!(operation.plan_id, Some(scenario.plan));
    assert_eq!(operation.operation_type.name, "Section");
    assert!(operation
        .actions
        .iter()
        .all(|a| a.source_slot_id == scenario.block.slot_id && a.source_sample.id == sample));

    let rack = &result.labware[0];
    let a1: Vec<_> = rack.slot(addr("A1")).unwrap().samples.iter().map(|s| s.section).collect();
    let a2: Vec<_> = rack.slot(addr("A2")).unwrap().samples.iter().map(|s| s.section).collect();
    assert_eq!(a1, [Some(1), Some(2)]);
    assert_eq!(a2, [Some(3)]);
    assert!(rack
        .slots
        .iter()
        .flat_map(|s| &s.samples)
        .all(|s| s.tissue_id == scenario.block.sample.tissue_id));

    assert_eq!(watermark(&store, &scenario), Some(3));
    assert_eq!(store.operations().len(), 1);
    assert_eq!(store.samples().len(), 4);
}

#[test]
fn whole_labware_cancel_discards() {
    let scenario = RackScenario::new(Some(2));
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelled("RACK-1")]);

    let result = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap();

    assert!(result.operations.is_empty());
    assert_eq!(result.labware.len(), 1);
    assert!(result.labware[0].discarded);
    assert!(result.labware[0].is_empty());
    assert!(store.operations().is_empty());
    assert_eq!(watermark(&store, &scenario), Some(2));
    assert!(store.labware_by_barcode("RACK-1").unwrap().unwrap().discarded);
}

#[test]
fn section_at_watermark_is_rejected_without_writes() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", Some(9));
    let rack = fixture.labware("RACK-1", 1, 1);
    fixture.plan(vec![
        PlanStep::new(&block, rack, "A1").section(10),
        PlanStep::new(&block, rack, "A1").section(11),
    ]);
    let store = fixture.store();
    let before = store.snapshot().unwrap();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "RACK-1",
        sections(block.sample.id, &[("A1", 9)]),
    )]);

    let err = engine.confirm(&store, &fixture.user(), &request).unwrap_err();

    assert!(err.is_user_correctable());
    assert!(err.to_string().contains("must be greater than 9"));
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn deleted_comment_is_rejected() {
    let mut scenario = RackScenario::new(None);
    let comment = scenario.fixture.comment("Section folded");
    let store = scenario.fixture.store();
    store.delete_comment(comment);
    let engine = ConfirmEngine::new(SectionStrategy);
    let sample = scenario.block.sample.id;
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "RACK-1",
        sections(sample, &[("A1", 1)]),
    )
    .with_comments(vec![AddressComment::new(addr("A1"), comment)])]);

    let err = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap_err();

    assert_eq!(err.problems(), [Problem::UnknownComments(vec![comment])]);
    assert!(store.operations().is_empty());
    assert!(store.operation_comments().is_empty());
}

#[test]
fn repeated_section_is_rejected() {
    let scenario = RackScenario::new(None);
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let sample = scenario.block.sample.id;
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "RACK-1",
        sections(sample, &[("A1", 5), ("A2", 5)]),
    )]);

    let err = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap_err();

    assert!(matches!(err, ConfirmError::Validation(_)));
    assert!(err.to_string().contains("Repeated section"));
    assert!(store.operations().is_empty());
}

#[test]
fn mixed_request_reports_discards_and_records_comments() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", None);
    let kept = fixture.labware("RACK-1", 1, 2);
    let dropped = fixture.labware("RACK-2", 1, 1);
    fixture.plan(vec![
        PlanStep::new(&block, kept, "A1").section(1),
        PlanStep::new(&block, kept, "A1").section(2),
    ]);
    fixture.plan(vec![PlanStep::new(&block, dropped, "A1").section(3)]);
    let torn = fixture.comment("Torn");
    let store = fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);

    let request = ConfirmationRequest::new(vec![
        ConfirmLabware::cancelling("RACK-1", vec![])
            .with_comments(vec![
                AddressComment::new(addr("A1"), torn),
                AddressComment::new(addr("A2"), torn),
            ]),
        ConfirmLabware::cancelling(
            "RACK-2",
            vec![CancelledAction::new(addr("A1"), block.sample.id, Some(3))],
        )
        .with_comments(vec![AddressComment::new(addr("A1"), torn)]),
    ]);
    let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

    assert_eq!(result.operations.len(), 1);
    assert_eq!(result.labware.len(), 2);
    assert!(result.labware[1].discarded);
    let operation_id = result.operations[0].id;

    let rows: Vec<_> = store
        .operation_comments()
        .into_iter()
        .map(|c| (c.labware_id, c.operation_id, c.sample_id.is_some()))
        .collect();
    assert_eq!(
        rows,
        [
            (kept, Some(operation_id), true),
            (kept, Some(operation_id), true),
            (kept, Some(operation_id), false),
            (dropped, None, false),
        ]
    );
    // Block watermark only reflects the confirmed labware
    assert_eq!(
        store.slot(block.slot_id).unwrap().unwrap().block_highest_section,
        Some(2)
    );
}

#[test]
fn thickness_measurements_are_stored() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", None);
    let slide = fixture.labware("SLIDE-1", 2, 1);
    fixture.plan(vec![
        PlanStep::new(&block, slide, "A1").section(1).thickness(4),
        PlanStep::new(&block, slide, "B1").section(2).thickness(5),
    ]);
    let store = fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelling("SLIDE-1", vec![])]);

    let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

    let values: Vec<_> = store
        .measurements()
        .into_iter()
        .map(|m| (m.name, m.value, m.operation_id))
        .collect();
    let op = result.operations[0].id;
    assert_eq!(
        values,
        [
            ("Thickness".to_string(), "4".to_string(), op),
            ("Thickness".to_string(), "5".to_string(), op),
        ]
    );
}

#[test]
fn planned_strategy_applies_bio_state_from_plan() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", None);
    let tubes = fixture.labware("TUBES-1", 1, 2);
    fixture.plan(vec![
        PlanStep::new(&block, tubes, "A1").bio_state(BioStateId(3)),
        PlanStep::new(&block, tubes, "A2").bio_state(BioStateId(3)),
    ]);
    let store = fixture.store();
    let engine = ConfirmEngine::new(PlannedStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "TUBES-1",
        vec![
            ConfirmedSection::new(addr("A1"), block.sample.id, None),
            ConfirmedSection::new(addr("A2"), block.sample.id, None),
        ],
    )]);

    let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

    let produced: Vec<_> = result.operations[0]
        .actions
        .iter()
        .map(|a| (a.sample.id, a.sample.bio_state, a.sample.section))
        .collect();
    assert_eq!(produced[0], produced[1]);
    assert_eq!(produced[0].1, BioStateId(3));
    assert_eq!(produced[0].2, None);
    assert_eq!(store.samples().len(), 2);
    assert_eq!(
        store.slot(block.slot_id).unwrap().unwrap().block_highest_section,
        None
    );
}

#[test]
fn second_confirmation_of_same_labware_is_rejected() {
    let scenario = RackScenario::new(None);
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelling("RACK-1", vec![])]);
    engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap();

    let err = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap_err();
    assert!(err
        .problems()
        .contains(&Problem::LabwareNotEmpty("RACK-1".into())));
    assert_eq!(store.operations().len(), 1);
}

fn slot_sections(store: &MemoryStore, barcode: &str, address: &str) -> Vec<Option<i32>> {
    let labware = store.labware_by_barcode(barcode).unwrap().unwrap();
    labware
        .slot(addr(address))
        .unwrap()
        .samples
        .iter()
        .map(|s| s.section)
        .collect()
}

fn measured(store: &MemoryStore) -> Vec<(SampleId, String)> {
    store
        .measurements()
        .into_iter()
        .map(|m| (m.sample_id, m.value))
        .collect()
}

#[test]
fn out_of_order_sections_keep_their_own_thickness() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", None);
    let slide = fixture.labware("SLIDE-1", 1, 1);
    fixture.plan(vec![
        PlanStep::new(&block, slide, "A1").section(1).thickness(4),
        PlanStep::new(&block, slide, "A1").section(2).thickness(5),
    ]);
    let store = fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "SLIDE-1",
        sections(block.sample.id, &[("A1", 5), ("A1", 1)]),
    )]);

    let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

    let produced: Vec<_> = result.operations[0]
        .actions
        .iter()
        .map(|a| (a.sample.id, a.sample.section))
        .collect();
    assert_eq!(produced.len(), 2);
    assert_eq!(produced[0].1, Some(5));
    assert_eq!(produced[1].1, Some(1));
    // Section 5 took the unmatched plan action; section 1 its namesake
    assert_eq!(
        measured(&store),
        [(produced[0].0, "5".to_string()), (produced[1].0, "4".to_string())]
    );
    assert_eq!(slot_sections(&store, "SLIDE-1", "A1"), [Some(5), Some(1)]);
    assert_eq!(
        store.slot(block.slot_id).unwrap().unwrap().block_highest_section,
        Some(5)
    );
}

#[test]
fn planned_strategy_confirms_every_shared_action() {
    let scenario = RackScenario::new(None);
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(PlannedStrategy);
    let sample = scenario.block.sample.id;
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "RACK-1",
        vec![
            ConfirmedSection::new(addr("A1"), sample, None),
            ConfirmedSection::new(addr("A1"), sample, None),
            ConfirmedSection::new(addr("A2"), sample, None),
        ],
    )]);

    let result = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap();

    let produced: Vec<_> = result.operations[0]
        .actions
        .iter()
        .map(|a| a.sample.section)
        .collect();
    assert_eq!(produced, [Some(1), Some(2), Some(3)]);
    assert_eq!(slot_sections(&store, "RACK-1", "A1"), [Some(1), Some(2)]);
    assert_eq!(slot_sections(&store, "RACK-1", "A2"), [Some(3)]);
    assert_eq!(watermark(&store, &scenario), Some(3));
}

#[test]
fn shared_key_actions_keep_their_own_bio_state_and_thickness() {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", None);
    let tube = fixture.labware("TUBE-1", 1, 1);
    fixture.plan(vec![
        PlanStep::new(&block, tube, "A1").bio_state(BioStateId(2)).thickness(4),
        PlanStep::new(&block, tube, "A1").bio_state(BioStateId(3)).thickness(5),
    ]);
    let store = fixture.store();
    let engine = ConfirmEngine::new(PlannedStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::confirmed(
        "TUBE-1",
        vec![
            ConfirmedSection::new(addr("A1"), block.sample.id, None),
            ConfirmedSection::new(addr("A1"), block.sample.id, None),
        ],
    )]);

    let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

    let produced: Vec<_> = result.operations[0]
        .actions
        .iter()
        .map(|a| (a.sample.id, a.sample.bio_state))
        .collect();
    assert_eq!(produced[0].1, BioStateId(2));
    assert_eq!(produced[1].1, BioStateId(3));
    assert_eq!(
        measured(&store),
        [(produced[0].0, "4".to_string()), (produced[1].0, "5".to_string())]
    );
    assert_eq!(store.samples().len(), 3);
}

#[test]
fn cancelling_one_section_twice_is_rejected() {
    let scenario = RackScenario::new(None);
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let sample = scenario.block.sample.id;
    let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelling(
        "RACK-1",
        vec![
            CancelledAction::new(addr("A1"), sample, Some(1)),
            CancelledAction::new(addr("A1"), sample, Some(1)),
        ],
    )]);

    let err = engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap_err();

    assert_eq!(
        err.problems(),
        [Problem::RepeatedEntry {
            barcode: "RACK-1".into(),
            address: addr("A1"),
            sample_id: sample,
        }]
    );
    assert!(store.operations().is_empty());
    assert!(slot_sections(&store, "RACK-1", "A1").is_empty());
}

#[test]
fn repeated_comment_pair_is_recorded_once() {
    let mut scenario = RackScenario::new(None);
    let torn = scenario.fixture.comment("Torn");
    let store = scenario.fixture.store();
    let engine = ConfirmEngine::new(SectionStrategy);
    let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelled("RACK-1")
        .with_comments(vec![
            AddressComment::new(addr("A1"), torn),
            AddressComment::new(addr("A1"), torn),
        ])]);

    engine
        .confirm(&store, &scenario.fixture.user(), &request)
        .unwrap();

    let rows = store.operation_comments();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].operation_id, rows[0].sample_id), (None, None));
}
