//! Property tests for confirmation outcomes

use labtrack_confirm::{ConfirmEngine, PlannedStrategy, SectionStrategy};
use labtrack_model::{
    CancelledAction, ConfirmLabware, ConfirmationRequest, ConfirmedSection, Disposition,
    SampleId,
};
use labtrack_test_utils::{addr, BlockRef, LabFixture, PlanStep, RackScenario};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

/// How a generated labware entry is reported
#[derive(Debug, Clone, Copy)]
enum Report {
    WholeCancel,
    CancelEverything,
    CancelNothing,
    ConfirmFirst,
    ConfirmNothing,
}

impl Report {
    fn confirms(self) -> bool {
        matches!(self, Self::CancelNothing | Self::ConfirmFirst)
    }

    fn highest(self, first: i32, second: i32) -> Option<i32> {
        match self {
            Self::CancelNothing => Some(second),
            Self::ConfirmFirst => Some(first),
            _ => None,
        }
    }
}

fn report_strategy() -> impl Strategy<Value = Report> {
    prop_oneof![
        Just(Report::WholeCancel),
        Just(Report::CancelEverything),
        Just(Report::CancelNothing),
        Just(Report::ConfirmFirst),
        Just(Report::ConfirmNothing),
    ]
}

fn entry(barcode: &str, sample: SampleId, first: i32, second: i32, report: Report) -> ConfirmLabware {
    match report {
        Report::WholeCancel => ConfirmLabware::cancelled(barcode),
        Report::CancelEverything => ConfirmLabware::cancelling(
            barcode,
            vec![
                CancelledAction::new(addr("A1"), sample, Some(first)),
                CancelledAction::new(addr("A2"), sample, Some(second)),
            ],
        ),
        Report::CancelNothing => ConfirmLabware::cancelling(barcode, vec![]),
        Report::ConfirmFirst => ConfirmLabware::confirmed(
            barcode,
            vec![ConfirmedSection::new(addr("A1"), sample, Some(first))],
        ),
        Report::ConfirmNothing => ConfirmLabware::confirmed(barcode, vec![]),
    }
}

/// One block, one 1x2 rack per report, each rack planned two sections above `watermark`
fn racks(watermark: Option<i32>, reports: &[Report]) -> (LabFixture, BlockRef, ConfirmationRequest) {
    let mut fixture = LabFixture::new();
    let block = fixture.block("BLOCK-1", watermark);
    let base = watermark.unwrap_or(0);
    let mut entries = Vec::new();
    for (i, report) in reports.iter().enumerate() {
        let barcode = format!("RACK-{i}");
        let rack = fixture.labware(&barcode, 1, 2);
        let first = base + 2 * i32::try_from(i).unwrap() + 1;
        fixture.plan(vec![
            PlanStep::new(&block, rack, "A1").section(first),
            PlanStep::new(&block, rack, "A2").section(first + 1),
        ]);
        entries.push(entry(&barcode, block.sample.id, first, first + 1, *report));
    }
    (fixture, block, ConfirmationRequest::new(entries))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_one_operation_per_confirmed_labware(
        reports in prop::collection::vec(report_strategy(), 1..6),
        watermark in prop::option::of(0..5i32),
    ) {
        let (fixture, block, request) = racks(watermark, &reports);
        let store = fixture.store();
        let engine = ConfirmEngine::new(SectionStrategy);

        let result = engine.confirm(&store, &fixture.user(), &request).unwrap();

        let confirmed = reports.iter().filter(|r| r.confirms()).count();
        prop_assert_eq!(result.operations.len(), confirmed);
        prop_assert_eq!(result.labware.len(), reports.len());
        for (labware, report) in result.labware.iter().zip(&reports) {
            prop_assert_eq!(labware.discarded, !report.confirms());
        }

        let base = watermark.unwrap_or(0);
        let produced = reports
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let first = base + 2 * i32::try_from(i).unwrap() + 1;
                r.highest(first, first + 1)
            })
            .max();
        let expected = match (watermark, produced) {
            (Some(w), Some(p)) => Some(w.max(p)),
            (w, p) => w.or(p),
        };
        let stored = store.slot(block.slot_id).unwrap().unwrap().block_highest_section;
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn prop_watermark_never_lowers(
        watermark in prop::option::of(0..20i32),
        planned in prop::collection::vec(1..20i32, 1..5),
    ) {
        let mut fixture = LabFixture::new();
        let block = fixture.block("BLOCK-1", watermark);
        let slide = fixture.labware("SLIDE-1", 1, 1);
        fixture.plan(
            planned
                .iter()
                .map(|s| PlanStep::new(&block, slide, "A1").section(*s))
                .collect(),
        );
        let store = fixture.store();
        let engine = ConfirmEngine::new(PlannedStrategy);
        let request = ConfirmationRequest::new(vec![ConfirmLabware::cancelling("SLIDE-1", vec![])]);

        engine.confirm(&store, &fixture.user(), &request).unwrap();

        let highest = planned.iter().copied().max();
        let expected = match watermark {
            Some(w) => highest.map_or(w, |h| w.max(h)),
            None => highest.unwrap_or_default(),
        };
        let stored = store.slot(block.slot_id).unwrap().unwrap().block_highest_section;
        prop_assert_eq!(stored, Some(expected));
    }

    #[test]
    fn prop_derived_samples_are_unique_per_target(
        sections in prop::collection::vec(prop::option::of(1..4i32), 1..8),
    ) {
        let mut fixture = LabFixture::new();
        let block = fixture.block("BLOCK-1", None);
        let mut entries = Vec::new();
        for (i, section) in sections.iter().enumerate() {
            let barcode = format!("TUBE-{i}");
            let tube = fixture.labware(&barcode, 1, 1);
            let step = PlanStep::new(&block, tube, "A1");
            fixture.plan(vec![match section {
                Some(s) => step.section(*s),
                None => step,
            }]);
            entries.push(ConfirmLabware::cancelling(&barcode, vec![]));
        }
        let store = fixture.store();
        let engine = ConfirmEngine::new(PlannedStrategy);

        let result = engine
            .confirm(&store, &fixture.user(), &ConfirmationRequest::new(entries))
            .unwrap();

        let mut by_target: HashMap<_, HashSet<SampleId>> = HashMap::new();
        for action in result.operations.iter().flat_map(|op| &op.actions) {
            let key = (action.source_sample.id, action.sample.section, action.sample.bio_state);
            by_target.entry(key).or_default().insert(action.sample.id);
        }
        for ids in by_target.values() {
            prop_assert_eq!(ids.len(), 1);
        }
        // Only targets that differ from the block produce a new sample
        let distinct: HashSet<_> = sections.iter().flatten().collect();
        prop_assert_eq!(store.samples().len(), 1 + distinct.len());
    }
}

#[test]
fn cancelling_every_action_matches_whole_cancel() {
    let scenario = RackScenario::new(None);
    let sample = scenario.block.sample.id;
    let engine = ConfirmEngine::new(SectionStrategy);

    let whole = scenario.fixture.store();
    let whole_result = engine
        .confirm(
            &whole,
            &scenario.fixture.user(),
            &ConfirmationRequest::new(vec![ConfirmLabware::cancelled("RACK-1")]),
        )
        .unwrap();

    let listed = scenario.fixture.store();
    let every = ConfirmLabware::new(
        "RACK-1",
        Disposition::CancelledActions(vec![
            CancelledAction::new(addr("A1"), sample, Some(1)),
            CancelledAction::new(addr("A1"), sample, Some(2)),
            CancelledAction::new(addr("A2"), sample, Some(3)),
        ]),
    );
    let listed_result = engine
        .confirm(
            &listed,
            &scenario.fixture.user(),
            &ConfirmationRequest::new(vec![every]),
        )
        .unwrap();

    assert_eq!(listed_result, whole_result);
    assert_eq!(listed.snapshot().unwrap(), whole.snapshot().unwrap());
}
