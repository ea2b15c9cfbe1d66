//! Confirmation validator
//!
//! Runs every check before anything is written and collects all problems
//! instead of stopping at the first. Success yields a [`ValidatedRequest`],
//! which has no public constructor: the executor never sees a request that
//! skipped validation.

use crate::config::ConfirmConfig;
use crate::error::{ConfirmError, Problem};
use crate::plan_index::{ActionKey, PlanIndex};
use crate::strategy::ConfirmStrategy;
use crate::surviving::{claim_entries, surviving_actions, SurvivingAction};
use chrono::{DateTime, Utc};
use labtrack_model::{
    Address, CommentId, ConfirmLabware, ConfirmationRequest, Disposition, Labware, LabwareId,
    Plan, PlannedAction, SampleId, Slot, SlotId,
};
use labtrack_store::{CommentRepo, ConfirmStore, LabwareRepo, PlanRepo, SlotRepo, StoreError};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One labware that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedLabware {
    labware: Labware,
    plan: Plan,
    surviving: Vec<SurvivingAction>,
    comments: Vec<(Address, CommentId)>,
    performed: Option<DateTime<Utc>>,
    discard: bool,
}

impl ValidatedLabware {
    /// Labware as read during validation
    #[inline]
    #[must_use]
    pub fn labware(&self) -> &Labware {
        &self.labware
    }

    /// The one plan targeting this labware
    #[inline]
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Planned actions that actually happened
    #[inline]
    #[must_use]
    pub fn surviving(&self) -> &[SurvivingAction] {
        &self.surviving
    }

    /// Comments to record, by address
    #[inline]
    #[must_use]
    pub fn comments(&self) -> &[(Address, CommentId)] {
        &self.comments
    }

    /// Caller-supplied performed time
    #[inline]
    #[must_use]
    pub fn performed(&self) -> Option<DateTime<Utc>> {
        self.performed
    }

    /// Whole labware cancelled, or nothing survived cancellation
    #[inline]
    #[must_use]
    pub fn is_discard(&self) -> bool {
        self.discard
    }
}

/// Request that passed every check, in request order
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    labware: Vec<ValidatedLabware>,
    index: PlanIndex,
}

impl ValidatedRequest {
    /// Validated labware in request order
    #[inline]
    #[must_use]
    pub fn labware(&self) -> &[ValidatedLabware] {
        &self.labware
    }

    /// Index of the matched plans
    #[inline]
    #[must_use]
    pub fn index(&self) -> &PlanIndex {
        &self.index
    }

    /// Number of labware
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labware.len()
    }

    /// Whether there are no labware
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labware.is_empty()
    }
}

/// Request entry whose barcode resolved
struct Resolved<'r> {
    entry: &'r ConfirmLabware,
    labware: Labware,
    plan: Option<Plan>,
}

impl Resolved<'_> {
    fn barcode(&self) -> String {
        self.labware.barcode.clone()
    }
}

/// One line of a confirm or cancel list
struct Entry {
    key: ActionKey,
    section: Option<i32>,
    cancelled: bool,
}

fn listed_entries(disposition: &Disposition) -> Vec<Entry> {
    match disposition {
        Disposition::Cancelled => Vec::new(),
        Disposition::Confirmed(sections) => sections
            .iter()
            .map(|s| Entry {
                key: ActionKey::new(s.address, s.sample_id),
                section: s.section,
                cancelled: false,
            })
            .collect(),
        Disposition::CancelledActions(cancelled) => cancelled
            .iter()
            .map(|c| Entry {
                key: ActionKey::new(c.address, c.sample_id),
                section: c.section,
                cancelled: true,
            })
            .collect(),
    }
}

fn has_address(labware: &Labware, address: Address) -> bool {
    labware.labware_type.contains(address) && labware.slot(address).is_some()
}

fn reject(problems: Vec<Problem>) -> ConfirmError {
    tracing::warn!(problems = problems.len(), "confirmation request failed validation");
    ConfirmError::Validation(problems)
}

/// Pre-flight checks over a whole confirmation request
#[derive(Debug)]
pub struct ConfirmValidator<'a, S: ?Sized> {
    strategy: &'a S,
    config: &'a ConfirmConfig,
}

impl<'a, S: ConfirmStrategy + ?Sized> ConfirmValidator<'a, S> {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new(strategy: &'a S, config: &'a ConfirmConfig) -> Self {
        Self { strategy, config }
    }

    /// Validate `request` against the current store state
    ///
    /// `now` bounds explicit performed times.
    ///
    /// # Errors
    /// Returns [`ConfirmError::Validation`] with every problem found, or
    /// [`ConfirmError::Store`] if a lookup fails
    pub fn validate<R: ConfirmStore + ?Sized>(
        &self,
        store: &R,
        request: &ConfirmationRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidatedRequest, ConfirmError> {
        let mut problems = Vec::new();
        if request.labware.is_empty() {
            problems.push(Problem::NoLabware);
            return Err(reject(problems));
        }
        let max = self.config.max_labware_per_request;
        if request.labware.len() > max {
            problems.push(Problem::TooManyLabware {
                count: request.labware.len(),
                max,
            });
        }

        let mut resolved = resolve_labware(store, request, &mut problems)?;
        for r in &resolved {
            check_labware_state(&r.labware, &mut problems);
        }
        let index = resolve_plans(store, &mut resolved, &mut problems)?;

        let mut surviving = Vec::with_capacity(resolved.len());
        for r in &resolved {
            if r.plan.is_some() {
                check_entries(r, &index, &mut problems);
            }
            check_comment_addresses(r, &mut problems);
            self.check_performed(r, now, &mut problems);
            surviving.push(surviving_actions(
                &r.entry.disposition,
                r.labware.id,
                &index,
            ));
        }

        if self.strategy.validates_sections() {
            self.check_sections(store, &resolved, &surviving, &index, &mut problems)?;
        }
        check_comment_ids(store, request, &mut problems)?;

        if !problems.is_empty() {
            return Err(reject(problems));
        }

        let labware = resolved
            .into_iter()
            .zip(surviving)
            .filter_map(|(r, surviving)| {
                let plan = r.plan?;
                let discard =
                    matches!(r.entry.disposition, Disposition::Cancelled) || surviving.is_empty();
                let comments = r
                    .entry
                    .comments
                    .iter()
                    .filter_map(|c| Some((c.address?, c.comment_id)))
                    .collect();
                Some(ValidatedLabware {
                    labware: r.labware,
                    plan,
                    surviving,
                    comments,
                    performed: r.entry.performed,
                    discard,
                })
            })
            .collect();
        tracing::debug!(strategy = self.strategy.name(), "confirmation request validated");
        Ok(ValidatedRequest { labware, index })
    }

    fn check_performed(&self, r: &Resolved<'_>, now: DateTime<Utc>, problems: &mut Vec<Problem>) {
        if let Some(performed) = r.entry.performed {
            if self.config.reject_future_performed && performed > now {
                problems.push(Problem::PerformedInFuture {
                    barcode: r.barcode(),
                    performed,
                });
            }
        }
    }

    /// Section presence, sign, freshness against the block and uniqueness
    fn check_sections<R: SlotRepo + ?Sized>(
        &self,
        store: &R,
        resolved: &[Resolved<'_>],
        surviving: &[Vec<SurvivingAction>],
        index: &PlanIndex,
        problems: &mut Vec<Problem>,
    ) -> Result<(), StoreError> {
        let mut targets: Vec<(&Resolved<'_>, &PlannedAction, &SurvivingAction, Option<i32>)> =
            Vec::new();
        for (r, actions) in resolved.iter().zip(surviving) {
            for action in actions {
                let Some(planned) = index.find(r.labware.id, &action.key, action.action_id) else {
                    continue;
                };
                let section = self.strategy.target(planned, action).section;
                targets.push((r, planned, action, section));
            }
        }
        if targets.is_empty() {
            return Ok(());
        }

        let slot_ids: Vec<SlotId> = targets
            .iter()
            .map(|(_, planned, _, _)| planned.source_slot_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let slots: HashMap<SlotId, Slot> = store
            .find_slots(&slot_ids)?
            .into_iter()
            .map(|slot| (slot.id, slot))
            .collect();

        let mut seen: HashSet<(SampleId, i32)> = HashSet::new();
        let mut reported: HashSet<(SampleId, i32)> = HashSet::new();
        for (r, planned, action, section) in targets {
            let Some(section) = section else {
                problems.push(Problem::MissingSection {
                    barcode: r.barcode(),
                    address: action.key.address,
                    sample_id: action.key.sample_id,
                });
                continue;
            };
            if section < 0 {
                problems.push(Problem::NegativeSection {
                    barcode: r.barcode(),
                    address: action.key.address,
                    section,
                });
                continue;
            }
            let sample_id = planned.sample.id;
            if let Some(slot) = slots.get(&planned.source_slot_id) {
                if let (true, Some(watermark)) =
                    (slot.is_block_of(sample_id), slot.block_highest_section)
                {
                    if section <= watermark {
                        problems.push(Problem::SectionNotAboveWatermark {
                            sample_id,
                            section,
                            watermark,
                            slot_id: slot.id,
                        });
                    }
                }
            }
            let pair = (sample_id, section);
            if !seen.insert(pair) && reported.insert(pair) {
                problems.push(Problem::RepeatedSection { sample_id, section });
            }
        }
        Ok(())
    }
}

/// Barcode presence, uniqueness and resolution
fn resolve_labware<'r, R: LabwareRepo + ?Sized>(
    store: &R,
    request: &'r ConfirmationRequest,
    problems: &mut Vec<Problem>,
) -> Result<Vec<Resolved<'r>>, StoreError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: HashSet<&str> = HashSet::new();
    let mut missing = false;
    let mut wanted = Vec::new();

    for entry in &request.labware {
        let barcode = entry.barcode.trim();
        if barcode.is_empty() {
            if !missing {
                problems.push(Problem::MissingBarcode);
                missing = true;
            }
            continue;
        }
        if !seen.insert(barcode) {
            if duplicates.insert(barcode) {
                problems.push(Problem::DuplicateBarcode(barcode.to_string()));
            }
            continue;
        }
        wanted.push(entry);
    }
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let barcodes: Vec<String> = wanted.iter().map(|e| e.barcode.trim().to_string()).collect();
    let mut found: HashMap<String, Labware> = store
        .find_labware_by_barcodes(&barcodes)?
        .into_iter()
        .map(|lw| (lw.barcode.clone(), lw))
        .collect();

    let mut resolved = Vec::with_capacity(wanted.len());
    for entry in wanted {
        let barcode = entry.barcode.trim();
        match found.remove(barcode) {
            Some(labware) => resolved.push(Resolved {
                entry,
                labware,
                plan: None,
            }),
            None => problems.push(Problem::UnknownBarcode(barcode.to_string())),
        }
    }
    Ok(resolved)
}

fn check_labware_state(labware: &Labware, problems: &mut Vec<Problem>) {
    let barcode = &labware.barcode;
    if labware.destroyed {
        problems.push(Problem::LabwareDestroyed(barcode.clone()));
    }
    if labware.released {
        problems.push(Problem::LabwareReleased(barcode.clone()));
    }
    if labware.discarded {
        problems.push(Problem::LabwareDiscarded(barcode.clone()));
    }
    if labware.used {
        problems.push(Problem::LabwareUsed(barcode.clone()));
    }
    if !labware.is_empty() {
        problems.push(Problem::LabwareNotEmpty(barcode.clone()));
    }
}

/// Exactly one plan per labware
fn resolve_plans<R: PlanRepo + ?Sized>(
    store: &R,
    resolved: &mut [Resolved<'_>],
    problems: &mut Vec<Problem>,
) -> Result<PlanIndex, StoreError> {
    let mut index = PlanIndex::new();
    if resolved.is_empty() {
        return Ok(index);
    }
    let ids: Vec<LabwareId> = resolved.iter().map(|r| r.labware.id).collect();
    let plans = store.find_plans_for_labware(&ids)?;

    for r in resolved.iter_mut() {
        let matched: Vec<&Plan> = plans
            .iter()
            .filter(|plan| plan.actions_into(r.labware.id).next().is_some())
            .collect();
        match matched.as_slice() {
            [] => problems.push(Problem::NoPlan(r.barcode())),
            [plan] => {
                let count = index.insert_plan(r.labware.id, plan);
                tracing::debug!(barcode = %r.labware.barcode, plan = %plan.id, actions = count, "plan matched");
                r.plan = Some((*plan).clone());
            }
            many => problems.push(Problem::MultiplePlans {
                barcode: r.barcode(),
                plan_ids: many.iter().map(|plan| plan.id).collect(),
            }),
        }
    }
    Ok(index)
}

/// Address, plan membership, repetition and cancel-section checks
fn check_entries(r: &Resolved<'_>, index: &PlanIndex, problems: &mut Vec<Problem>) {
    let claims = claim_entries(&r.entry.disposition, r.labware.id, index);
    let mut counts: HashMap<ActionKey, usize> = HashMap::new();
    let mut reported: HashSet<ActionKey> = HashSet::new();

    for (entry, claim) in listed_entries(&r.entry.disposition).into_iter().zip(claims) {
        let ActionKey { address, sample_id } = entry.key;
        if !has_address(&r.labware, address) {
            problems.push(Problem::InvalidAddress {
                barcode: r.barcode(),
                address,
            });
            continue;
        }
        let planned = index.matching(r.labware.id, &entry.key);
        if planned.is_empty() {
            problems.push(Problem::UnexpectedSample {
                barcode: r.barcode(),
                address,
                sample_id,
            });
            continue;
        }

        let mismatched = match (entry.cancelled, entry.section) {
            (true, Some(given)) if !planned.iter().any(|a| a.new_section == Some(given)) => {
                problems.push(Problem::CancelledSectionMismatch {
                    barcode: r.barcode(),
                    address,
                    sample_id,
                    given,
                    planned: planned[0].new_section,
                });
                true
            }
            _ => false,
        };

        // Each planned action can be named once
        let count = counts.entry(entry.key).or_insert(0);
        *count += 1;
        let over_listed = *count > planned.len() || (claim.is_none() && !mismatched);
        if over_listed && reported.insert(entry.key) {
            problems.push(Problem::RepeatedEntry {
                barcode: r.barcode(),
                address,
                sample_id,
            });
        }
    }
}

/// Comments need an address inside the layout
fn check_comment_addresses(r: &Resolved<'_>, problems: &mut Vec<Problem>) {
    for comment in &r.entry.comments {
        match comment.address {
            None => problems.push(Problem::MissingCommentAddress {
                barcode: r.barcode(),
                comment_id: comment.comment_id,
            }),
            Some(address) if !has_address(&r.labware, address) => {
                problems.push(Problem::InvalidAddress {
                    barcode: r.barcode(),
                    address,
                });
            }
            Some(_) => {}
        }
    }
}

/// Every comment id must exist
fn check_comment_ids<R: CommentRepo + ?Sized>(
    store: &R,
    request: &ConfirmationRequest,
    problems: &mut Vec<Problem>,
) -> Result<(), StoreError> {
    let ids: Vec<CommentId> = request
        .labware
        .iter()
        .flat_map(|lw| lw.comments.iter().map(|c| c.comment_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    let found: HashSet<CommentId> = store
        .find_comments(&ids)?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let unknown: Vec<CommentId> = ids.into_iter().filter(|id| !found.contains(id)).collect();
    if !unknown.is_empty() {
        problems.push(Problem::UnknownComments(unknown));
    }
    Ok(())
}
