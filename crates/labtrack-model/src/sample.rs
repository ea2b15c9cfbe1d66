//! Samples and their lineage identity

use crate::ids::{BioStateId, SampleId, TissueId};
use serde::{Deserialize, Serialize};

/// Immutable sample row
///
/// A changed sample is always a new row; rows are never edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    /// Section number; `None` for an undifferentiated block
    pub section: Option<i32>,
    pub tissue_id: TissueId,
    pub bio_state: BioStateId,
}

impl Sample {
    /// Whether this sample is a numbered section
    #[inline]
    #[must_use]
    pub fn is_section(&self) -> bool {
        self.section.is_some()
    }
}

/// Fields for a sample about to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSample {
    pub section: Option<i32>,
    pub tissue_id: TissueId,
    pub bio_state: BioStateId,
}
