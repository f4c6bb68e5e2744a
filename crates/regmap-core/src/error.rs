//! Fatal allocation errors.

use thiserror::Error;

/// Errors that abort an allocation run. No partial output is valid after
/// any of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AllocationError {
    /// A word field was reached while the cursor was odd.
    #[error("word field '{region}.{field}' requires an even address, cursor is 0x{cursor:02X}")]
    Alignment {
        /// Owning region name.
        region: String,
        /// Offending field name.
        field: String,
        /// Declaration index of the field within its region.
        order: usize,
        /// Cursor value when the field was reached.
        cursor: u32,
    },
    /// A field kind is not a byte, a word, or a bitfield of width 1..=8.
    #[error("field '{region}.{field}' has unsupported kind '{kind}' (cursor 0x{cursor:02X})")]
    UnsupportedFieldKind {
        /// Owning region name.
        region: String,
        /// Offending field name.
        field: String,
        /// Declaration index of the field within its region.
        order: usize,
        /// Description of the rejected kind.
        kind: String,
        /// Cursor value when the field was reached.
        cursor: u32,
    },
    /// The field does not fit below the end of the 32-bit address space.
    #[error("field '{region}.{field}' does not fit in the address space (cursor 0x{cursor:02X})")]
    AddressOverflow {
        /// Owning region name.
        region: String,
        /// Offending field name.
        field: String,
        /// Declaration index of the field within its region.
        order: usize,
        /// Cursor value when the field was reached.
        cursor: u32,
    },
}

impl AllocationError {
    /// Region in which the error occurred.
    #[must_use]
    pub fn region(&self) -> &str {
        match self {
            Self::Alignment { region, .. }
            | Self::UnsupportedFieldKind { region, .. }
            | Self::AddressOverflow { region, .. } => region,
        }
    }

    /// Declaration index of the offending field.
    #[must_use]
    pub const fn order(&self) -> usize {
        match self {
            Self::Alignment { order, .. }
            | Self::UnsupportedFieldKind { order, .. }
            | Self::AddressOverflow { order, .. } => *order,
        }
    }
}
