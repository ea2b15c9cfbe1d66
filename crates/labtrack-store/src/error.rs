//! Store error types

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("unknown {table} id {id}")]
    UnknownId { table: &'static str, id: u64 },

    /// Two rows share an id in seeded data
    #[error("duplicate {table} id {id}")]
    DuplicateId { table: &'static str, id: u64 },

    /// Two labware share a barcode in seeded data
    #[error("duplicate barcode: {0}")]
    DuplicateBarcode(String),

    /// Snapshot (de)serialization failed
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot file IO failed
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Unknown row helper
    #[inline]
    #[must_use]
    pub fn unknown(table: &'static str, id: impl Into<u64>) -> Self {
        Self::UnknownId {
            table,
            id: id.into(),
        }
    }
}
