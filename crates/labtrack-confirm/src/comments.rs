//! Comment recorder

use crate::error::{ConfirmError, IntegrityError};
use labtrack_model::{
    Address, Comment, CommentId, Labware, NewOperationComment, OperationComment, OperationId,
};
use indexmap::IndexSet;
use labtrack_store::CommentRepo;
use std::collections::{BTreeSet, HashMap};

/// Attach comments to the contents of a labware's slots
///
/// Writes one row per sample present in the addressed slot, or one row with
/// no sample when the slot is empty. A pair listed twice is recorded once.
/// `operation_id` is `None` for discarded labware. Comment ids are resolved
/// once per call.
///
/// # Errors
/// Returns an integrity error for an unknown address or comment id
pub fn record_comments<R: CommentRepo + ?Sized>(
    store: &mut R,
    labware: &Labware,
    operation_id: Option<OperationId>,
    comments: &[(Address, CommentId)],
) -> Result<Vec<OperationComment>, ConfirmError> {
    if comments.is_empty() {
        return Ok(Vec::new());
    }
    let pairs: IndexSet<(Address, CommentId)> = comments.iter().copied().collect();
    let ids: Vec<CommentId> = pairs
        .iter()
        .map(|(_, id)| *id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let resolved: HashMap<CommentId, Comment> = store
        .find_comments(&ids)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut rows = Vec::new();
    for &(address, comment_id) in &pairs {
        let slot = labware
            .slot(address)
            .ok_or_else(|| IntegrityError::MissingSlot {
                barcode: labware.barcode.clone(),
                address,
            })?;
        let comment = resolved
            .get(&comment_id)
            .ok_or(IntegrityError::UnknownComment(comment_id))?;

        let row = |sample_id| NewOperationComment {
            comment: comment.clone(),
            operation_id,
            sample_id,
            labware_id: labware.id,
            slot_id: slot.id,
        };
        if slot.samples.is_empty() {
            rows.push(row(None));
        } else {
            rows.extend(slot.samples.iter().map(|s| row(Some(s.id))));
        }
    }
    let saved = store.save_operation_comments(rows)?;
    tracing::debug!(barcode = %labware.barcode, comments = saved.len(), "operation comments recorded");
    Ok(saved)
}
