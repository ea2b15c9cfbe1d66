//! Integer identifiers for persisted rows
//!
//! Every entity is referenced by a stable integer id rather than by in-memory
//! identity, so two equal copies of the same slot always group together.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw integer value
            #[inline]
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

row_id!(
    /// Sample row id
    SampleId
);
row_id!(
    /// Slot row id
    SlotId
);
row_id!(
    /// Labware row id
    LabwareId
);
row_id!(
    /// Plan row id
    PlanId
);
row_id!(
    /// Planned action row id
    PlanActionId
);
row_id!(
    /// Operation row id
    OperationId
);
row_id!(
    /// Action row id
    ActionId
);
row_id!(
    /// Measurement row id
    MeasurementId
);
row_id!(
    /// Comment (reference data) id
    CommentId
);
row_id!(
    /// Operation comment link id
    OperationCommentId
);
row_id!(
    /// Tissue id
    TissueId
);
row_id!(
    /// Bio-state id
    BioStateId
);
row_id!(
    /// Operation type id
    OperationTypeId
);
row_id!(
    /// User id
    UserId
);
