//! Serializable image of a whole store
//!
//! Used to seed [`MemoryStore`](crate::MemoryStore) from fixtures and to
//! export its committed state.

use labtrack_model::{
    Comment, Labware, Measurement, Operation, OperationComment, OperationType, Plan, Sample, User,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::StoreError;

/// Denormalised store contents
///
/// Samples held in slots or referenced by plans and operations do not need to
/// be repeated in `samples`; they are registered on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub operation_types: Vec<OperationType>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub labware: Vec<Labware>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub operation_comments: Vec<OperationComment>,
}

impl StoreSnapshot {
    /// Parse snapshot JSON
    ///
    /// # Errors
    /// Returns error on malformed JSON
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render snapshot as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read snapshot JSON from a file
    ///
    /// # Errors
    /// Returns error on IO failure or malformed JSON
    pub fn read(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write snapshot JSON to a file
    ///
    /// # Errors
    /// Returns error on IO or serialization failure
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
