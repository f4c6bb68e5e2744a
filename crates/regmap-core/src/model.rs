//! Declaration and region model.
//!
//! These are plain data types handed to the allocator by a front end. They
//! carry no logic beyond small classification helpers.

use std::fmt;

/// Widest bitfield that fits in a single register byte.
pub const REGISTER_BITS: u8 = 8;

/// Kind of a single field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FieldKind {
    /// Full 8-bit field occupying one address.
    Byte,
    /// Full 16-bit field occupying two addresses, even-aligned.
    Word,
    /// Packed bitfield of the given width.
    Bit(u8),
    /// A type the front end could not resolve. Carries the type text as
    /// written so the allocator can report it.
    Unresolved(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => write!(f, "byte"),
            Self::Word => write!(f, "word"),
            Self::Bit(width) => write!(f, "bitfield of width {width}"),
            Self::Unresolved(type_name) => write!(f, "{type_name}"),
        }
    }
}

/// One field within a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FieldDeclaration {
    /// Field identifier as it appears in constant names.
    pub name: String,
    /// Resolved field kind.
    pub kind: FieldKind,
    /// Zero-based position within the owning region.
    pub order: usize,
}

impl FieldDeclaration {
    /// Creates a field declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind, order: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            order,
        }
    }
}

/// Shape of a region's backing type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegionKind {
    /// Struct with byte, word, and bitfield members.
    BitfieldStruct,
    /// Non-struct type; allocates nothing.
    Opaque,
}

/// Host read/write policy shared by every field of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Access {
    /// Host may only read.
    ReadOnly,
    /// Host may read and write.
    ReadWrite,
}

impl Access {
    /// Short form used in generated comments and tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "RO",
            Self::ReadWrite => "RW",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, access-qualified group of field declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Region {
    /// Region identifier; namespace for its constants.
    pub name: String,
    /// Backing type shape.
    pub kind: RegionKind,
    /// Read/write policy.
    pub access: Access,
    /// Fields in declaration order.
    pub fields: Vec<FieldDeclaration>,
}

impl Region {
    /// Creates a bitfield-struct region from `(name, kind)` pairs, numbering
    /// fields in the order given.
    #[must_use]
    pub fn with_fields<N: Into<String>>(
        name: impl Into<String>,
        access: Access,
        fields: impl IntoIterator<Item = (N, FieldKind)>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RegionKind::BitfieldStruct,
            access,
            fields: fields
                .into_iter()
                .enumerate()
                .map(|(order, (name, kind))| FieldDeclaration::new(name, kind, order))
                .collect(),
        }
    }

    /// Creates an opaque region with no fields.
    #[must_use]
    pub fn opaque(name: impl Into<String>, access: Access) -> Self {
        Self {
            name: name.into(),
            kind: RegionKind::Opaque,
            access,
            fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_fields_numbers_in_order() {
        let region = Region::with_fields(
            "ADC",
            Access::ReadOnly,
            [("V_IN", FieldKind::Word), ("FLAG", FieldKind::Bit(1))],
        );
        assert_eq!(region.kind, RegionKind::BitfieldStruct);
        assert_eq!(region.fields[0].order, 0);
        assert_eq!(region.fields[1].order, 1);
        assert_eq!(region.fields[1].name, "FLAG");
    }

    #[test]
    fn opaque_region_is_empty() {
        let region = Region::opaque("RAW", Access::ReadWrite);
        assert_eq!(region.kind, RegionKind::Opaque);
        assert!(region.fields.is_empty());
    }

    #[test]
    fn kind_display() {
        assert_eq!(FieldKind::Bit(3).to_string(), "bitfield of width 3");
        assert_eq!(
            FieldKind::Unresolved("uint32_t".into()).to_string(),
            "uint32_t"
        );
        assert_eq!(Access::ReadWrite.to_string(), "RW");
    }
}
