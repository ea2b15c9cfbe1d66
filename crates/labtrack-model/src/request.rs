//! Confirmation request and response shapes

use crate::address::Address;
use crate::ids::{CommentId, SampleId};
use crate::labware::Labware;
use crate::operation::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report of what was actually produced for a set of planned labware
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub labware: Vec<ConfirmLabware>,
}

impl ConfirmationRequest {
    /// Create request from labware entries
    #[inline]
    #[must_use]
    pub fn new(labware: Vec<ConfirmLabware>) -> Self {
        Self { labware }
    }
}

/// Report for one destination labware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmLabware {
    pub barcode: String,
    pub disposition: Disposition,
    #[serde(default)]
    pub comments: Vec<AddressComment>,
    /// Overrides the default performed time of the created operation
    #[serde(default)]
    pub performed: Option<DateTime<Utc>>,
}

impl ConfirmLabware {
    /// Labware reported with the given disposition
    #[must_use]
    pub fn new(barcode: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            barcode: barcode.into(),
            disposition,
            comments: Vec::new(),
            performed: None,
        }
    }

    /// Whole labware cancelled
    #[must_use]
    pub fn cancelled(barcode: impl Into<String>) -> Self {
        Self::new(barcode, Disposition::Cancelled)
    }

    /// Confirm-list encoding
    #[must_use]
    pub fn confirmed(barcode: impl Into<String>, sections: Vec<ConfirmedSection>) -> Self {
        Self::new(barcode, Disposition::Confirmed(sections))
    }

    /// Cancel-list encoding
    #[must_use]
    pub fn cancelling(barcode: impl Into<String>, cancelled: Vec<CancelledAction>) -> Self {
        Self::new(barcode, Disposition::CancelledActions(cancelled))
    }

    /// Attach comments
    #[must_use]
    pub fn with_comments(mut self, comments: Vec<AddressComment>) -> Self {
        self.comments = comments;
        self
    }

    /// Set explicit performed time
    #[must_use]
    pub fn with_performed(mut self, performed: DateTime<Utc>) -> Self {
        self.performed = Some(performed);
        self
    }
}

/// What happened to the planned contents of a labware
///
/// The two list encodings are convertible: both are normalised into the
/// surviving planned actions before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Whole labware cancelled
    Cancelled,
    /// Only the listed planned actions happened
    Confirmed(Vec<ConfirmedSection>),
    /// Every planned action happened except the listed ones
    CancelledActions(Vec<CancelledAction>),
}

/// Confirmed planned action, keyed by destination address and source sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedSection {
    pub address: Address,
    pub sample_id: SampleId,
    /// Section number actually taken
    #[serde(default)]
    pub section: Option<i32>,
}

impl ConfirmedSection {
    /// Create entry
    #[inline]
    #[must_use]
    pub fn new(address: Address, sample_id: SampleId, section: Option<i32>) -> Self {
        Self {
            address,
            sample_id,
            section,
        }
    }
}

/// Cancelled planned action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledAction {
    pub address: Address,
    pub sample_id: SampleId,
    /// Planned section, if the caller echoes it back
    #[serde(default)]
    pub section: Option<i32>,
}

impl CancelledAction {
    /// Create entry
    #[inline]
    #[must_use]
    pub fn new(address: Address, sample_id: SampleId, section: Option<i32>) -> Self {
        Self {
            address,
            sample_id,
            section,
        }
    }
}

/// Comment to record against the contents of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComment {
    #[serde(default)]
    pub address: Option<Address>,
    pub comment_id: CommentId,
}

impl AddressComment {
    /// Comment at an address
    #[inline]
    #[must_use]
    pub fn new(address: Address, comment_id: CommentId) -> Self {
        Self {
            address: Some(address),
            comment_id,
        }
    }
}

/// Outcome of a confirmation
///
/// Discarded labware contributes no operation but is still listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operations: Vec<Operation>,
    pub labware: Vec<Labware>,
}
