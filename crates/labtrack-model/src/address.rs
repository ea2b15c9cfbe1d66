//! Slot addresses within a labware layout
//!
//! Provides [`Address`]: a row letter followed by a 1-based column, e.g. `A1`
//! or `B12`. Addresses order row-major, which is also the order slots are
//! reported in.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Row-major slot address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    /// 1-based row (`A` = 1)
    row: u8,
    /// 1-based column
    column: u8,
}

/// Address parse/construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Empty input
    #[error("empty address")]
    Empty,

    /// Row is not a letter A-Z
    #[error("invalid row in address {0:?}")]
    InvalidRow(String),

    /// Column missing, zero or out of range
    #[error("invalid column in address {0:?}")]
    InvalidColumn(String),
}

impl Address {
    /// Create address from 1-based row and column
    ///
    /// # Errors
    /// Returns error if row is outside 1..=26 or column is zero
    pub fn new(row: u8, column: u8) -> Result<Self, AddressError> {
        if !(1..=26).contains(&row) {
            return Err(AddressError::InvalidRow(row.to_string()));
        }
        if column == 0 {
            return Err(AddressError::InvalidColumn(column.to_string()));
        }
        Ok(Self { row, column })
    }

    /// 1-based row
    #[inline]
    #[must_use]
    pub fn row(self) -> u8 {
        self.row
    }

    /// 1-based column
    #[inline]
    #[must_use]
    pub fn column(self) -> u8 {
        self.column
    }

    /// Row letter
    #[inline]
    #[must_use]
    pub fn row_letter(self) -> char {
        char::from(b'A' + self.row - 1)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.column)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let first = chars.next().ok_or(AddressError::Empty)?;
        let letter = first.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return Err(AddressError::InvalidRow(s.to_string()));
        }
        let rest = chars.as_str();
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidColumn(s.to_string()));
        }
        let column: u8 = rest
            .parse()
            .map_err(|_| AddressError::InvalidColumn(s.to_string()))?;
        if column == 0 {
            return Err(AddressError::InvalidColumn(s.to_string()));
        }
        // ASCII uppercase letters fit in one byte
        let row = letter as u8 - b'A' + 1;
        Ok(Self { row, column })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
