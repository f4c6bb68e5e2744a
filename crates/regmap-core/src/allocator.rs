//! Address and bit-offset allocation.
//!
//! The allocator walks field declarations strictly in order and assigns each
//! one a byte address and, for bitfields, a bit range inside that byte. Its
//! state is a byte cursor and a bit cursor shared by every region of a run,
//! so addresses are global rather than per-region.
//!
//! Bitfields pack from bit 0 upwards. Any byte or word field flushes a
//! partially filled register first, and a bitfield that would not fit in
//! what is left of the open register starts a new one. Words additionally
//! require an even cursor.

use crate::error::AllocationError;
use crate::model::{FieldDeclaration, FieldKind, Region, REGISTER_BITS};

/// The allocator's only mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorState {
    /// Next free byte address, or the open register while a run is active.
    pub cursor: u32,
    /// Bits already used in the open register, `0..=8`.
    pub bit_cursor: u8,
    /// Whether a bitfield register is currently open.
    pub in_bitfield_run: bool,
}

/// Placement of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AllocationResult {
    /// 8-bit field.
    ByteField {
        /// Field name.
        name: String,
        /// Assigned address.
        address: u32,
    },
    /// 16-bit field; `address` is always even.
    WordField {
        /// Field name.
        name: String,
        /// Assigned (even) address.
        address: u32,
    },
    /// Sub-byte field packed into a register.
    BitField {
        /// Field name.
        name: String,
        /// Address of the containing register.
        register_address: u32,
        /// First bit occupied (inclusive).
        bit_low: u8,
        /// One past the last bit occupied (exclusive).
        bit_high: u8,
    },
}

impl AllocationResult {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ByteField { name, .. }
            | Self::WordField { name, .. }
            | Self::BitField { name, .. } => name,
        }
    }

    /// Address of the field, or of the containing register for bitfields.
    #[must_use]
    pub const fn address(&self) -> u32 {
        match self {
            Self::ByteField { address, .. } | Self::WordField { address, .. } => *address,
            Self::BitField {
                register_address, ..
            } => *register_address,
        }
    }

    /// Whether this bitfield was the first placed in its register.
    ///
    /// A register always opens at bit 0, so this is exactly `bit_low == 0`.
    #[must_use]
    pub const fn opens_register(&self) -> bool {
        matches!(self, Self::BitField { bit_low: 0, .. })
    }
}

/// Allocation of one region.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionAllocation {
    /// The region as declared.
    pub region: Region,
    /// One result per field, in declaration order.
    pub results: Vec<AllocationResult>,
    /// Cursor when the region started.
    pub start_address: u32,
    /// Cursor after the region was closed.
    pub end_address: u32,
}

/// A finished register map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterMap {
    /// Region allocations in encounter order.
    pub regions: Vec<RegionAllocation>,
    /// Cursor after the last region (one past the last used address).
    pub end_address: u32,
}

impl RegisterMap {
    /// Iterates every allocation result with its region.
    pub fn results(&self) -> impl Iterator<Item = (&Region, &AllocationResult)> {
        self.regions
            .iter()
            .flat_map(|ra| ra.results.iter().map(move |r| (&ra.region, r)))
    }
}

/// Sequential address allocator.
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    state: AllocatorState,
}

impl Allocator {
    /// Creates an allocator with the cursor at address 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator with the cursor at `address`.
    #[must_use]
    pub const fn starting_at(address: u32) -> Self {
        Self {
            state: AllocatorState {
                cursor: address,
                bit_cursor: 0,
                in_bitfield_run: false,
            },
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AllocatorState {
        self.state
    }

    /// Allocates `fields` in order without closing the region.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::Alignment` when a word field is reached at
    /// an odd cursor, `AllocationError::UnsupportedFieldKind` for unresolved
    /// kinds and bitfield widths outside `1..=8`, and
    /// `AllocationError::AddressOverflow` when a field would end past
    /// `u32::MAX`.
    pub fn allocate(
        &mut self,
        region: &str,
        fields: &[FieldDeclaration],
    ) -> Result<Vec<AllocationResult>, AllocationError> {
        fields
            .iter()
            .map(|field| self.allocate_field(region, field))
            .collect()
    }

    /// Allocates a whole region and closes any open bitfield run at its end.
    ///
    /// # Errors
    ///
    /// See [`Allocator::allocate`].
    pub fn allocate_region(&mut self, region: &Region) -> Result<RegionAllocation, AllocationError> {
        let start_address = self.state.cursor;
        let results = self.allocate(&region.name, &region.fields)?;
        self.close_region();
        Ok(RegionAllocation {
            region: region.clone(),
            results,
            start_address,
            end_address: self.state.cursor,
        })
    }

    /// Closes an open bitfield run, if any.
    pub fn close_region(&mut self) {
        if self.state.in_bitfield_run {
            self.close_run();
        }
    }

    /// A register is only opened after `reserve` has checked that the
    /// address after it exists, so closing it cannot overflow.
    fn close_run(&mut self) {
        self.state.cursor += 1;
        self.state.bit_cursor = 0;
        self.state.in_bitfield_run = false;
    }

    fn allocate_field(
        &mut self,
        region: &str,
        field: &FieldDeclaration,
    ) -> Result<AllocationResult, AllocationError> {
        match &field.kind {
            FieldKind::Byte => {
                self.close_region();
                let address = self.state.cursor;
                self.state.cursor = self.reserve(region, field, 1)?;
                Ok(AllocationResult::ByteField {
                    name: field.name.clone(),
                    address,
                })
            }
            FieldKind::Word => {
                self.close_region();
                let address = self.state.cursor;
                if address % 2 != 0 {
                    return Err(AllocationError::Alignment {
                        region: region.to_string(),
                        field: field.name.clone(),
                        order: field.order,
                        cursor: address,
                    });
                }
                self.state.cursor = self.reserve(region, field, 2)?;
                Ok(AllocationResult::WordField {
                    name: field.name.clone(),
                    address,
                })
            }
            FieldKind::Bit(width) if (1..=REGISTER_BITS).contains(width) => {
                if self.state.in_bitfield_run && self.state.bit_cursor + width > REGISTER_BITS {
                    self.close_run();
                }
                if !self.state.in_bitfield_run {
                    self.reserve(region, field, 1)?;
                }
                self.state.in_bitfield_run = true;
                let bit_low = self.state.bit_cursor;
                self.state.bit_cursor += width;
                Ok(AllocationResult::BitField {
                    name: field.name.clone(),
                    register_address: self.state.cursor,
                    bit_low,
                    bit_high: self.state.bit_cursor,
                })
            }
            kind @ (FieldKind::Bit(_) | FieldKind::Unresolved(_)) => {
                Err(AllocationError::UnsupportedFieldKind {
                    region: region.to_string(),
                    field: field.name.clone(),
                    order: field.order,
                    kind: kind.to_string(),
                    cursor: self.state.cursor,
                })
            }
        }
    }

    /// Cursor after `bytes` more bytes, or `AddressOverflow` when they would
    /// run past `u32::MAX`.
    fn reserve(
        &self,
        region: &str,
        field: &FieldDeclaration,
        bytes: u32,
    ) -> Result<u32, AllocationError> {
        self.state
            .cursor
            .checked_add(bytes)
            .ok_or_else(|| AllocationError::AddressOverflow {
                region: region.to_string(),
                field: field.name.clone(),
                order: field.order,
                cursor: self.state.cursor,
            })
    }
}

/// Allocates every region in order with one shared allocator.
///
/// # Errors
///
/// Returns the first `AllocationError` encountered; nothing allocated before
/// it is returned.
pub fn allocate_map(regions: &[Region], start_address: u32) -> Result<RegisterMap, AllocationError> {
    let mut allocator = Allocator::starting_at(start_address);
    let regions = regions
        .iter()
        .map(|region| allocator.allocate_region(region))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RegisterMap {
        regions,
        end_address: allocator.state().cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Access;

    fn bit(name: &str, low: u8, high: u8, register: u32) -> AllocationResult {
        AllocationResult::BitField {
            name: name.into(),
            register_address: register,
            bit_low: low,
            bit_high: high,
        }
    }

    #[test]
    fn empty_region() {
        let region = Region::with_fields("EMPTY", Access::ReadOnly, Vec::<(&str, FieldKind)>::new());
        let mut allocator = Allocator::new();
        let result = allocator.allocate_region(&region).unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.start_address, 0);
        assert_eq!(result.end_address, 0);
    }

    #[test]
    fn byte_fields_are_consecutive() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [("A", FieldKind::Byte), ("B", FieldKind::Byte)],
        );
        let result = Allocator::new().allocate_region(&region).unwrap();
        assert_eq!(result.results[0].address(), 0);
        assert_eq!(result.results[1].address(), 1);
        assert_eq!(result.end_address, 2);
    }

    #[test]
    fn word_then_bitfield_run() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [
                ("TEMP", FieldKind::Word),
                ("FLAG1", FieldKind::Bit(1)),
                ("FLAG2", FieldKind::Bit(2)),
                ("MODE", FieldKind::Bit(5)),
            ],
        );
        let mut allocator = Allocator::new();
        let result = allocator.allocate_region(&region).unwrap();
        assert_eq!(
            result.results,
            vec![
                AllocationResult::WordField {
                    name: "TEMP".into(),
                    address: 0
                },
                bit("FLAG1", 0, 1, 2),
                bit("FLAG2", 1, 3, 2),
                bit("MODE", 3, 8, 2),
            ]
        );
        assert_eq!(allocator.state().cursor, 3);
        assert!(!allocator.state().in_bitfield_run);
    }

    #[test]
    fn word_at_odd_cursor_fails() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [("A", FieldKind::Byte), ("B", FieldKind::Word)],
        );
        let err = Allocator::new().allocate_region(&region).unwrap_err();
        assert_eq!(
            err,
            AllocationError::Alignment {
                region: "R".into(),
                field: "B".into(),
                order: 1,
                cursor: 1,
            }
        );
    }

    #[test]
    fn byte_closes_bitfield_run() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [("X", FieldKind::Bit(3)), ("Y", FieldKind::Byte)],
        );
        let result = Allocator::new().allocate_region(&region).unwrap();
        assert_eq!(result.results[0], bit("X", 0, 3, 0));
        assert_eq!(
            result.results[1],
            AllocationResult::ByteField {
                name: "Y".into(),
                address: 1
            }
        );
        assert_eq!(result.end_address, 2);
    }

    #[test]
    fn full_register_opens_next() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [
                ("A", FieldKind::Bit(8)),
                ("B", FieldKind::Bit(1)),
            ],
        );
        let result = Allocator::new().allocate_region(&region).unwrap();
        assert_eq!(result.results[0], bit("A", 0, 8, 0));
        assert_eq!(result.results[1], bit("B", 0, 1, 1));
        assert!(result.results[1].opens_register());
        assert_eq!(result.end_address, 2);
    }

    #[test]
    fn overflowing_bitfield_moves_to_next_register() {
        let region = Region::with_fields(
            "R",
            Access::ReadWrite,
            [
                ("A", FieldKind::Bit(6)),
                ("B", FieldKind::Bit(3)),
            ],
        );
        let result = Allocator::new().allocate_region(&region).unwrap();
        assert_eq!(result.results[0], bit("A", 0, 6, 0));
        assert_eq!(result.results[1], bit("B", 0, 3, 1));
    }

    #[test]
    fn regions_share_the_cursor() {
        let regions = [
            Region::with_fields("A", Access::ReadOnly, [("X", FieldKind::Bit(1))]),
            Region::opaque("B", Access::ReadOnly),
            Region::with_fields("C", Access::ReadWrite, [("Y", FieldKind::Byte)]),
        ];
        let map = allocate_map(&regions, 0x10).unwrap();
        assert_eq!(map.regions[0].results[0], bit("X", 0, 1, 0x10));
        assert_eq!(map.regions[1].start_address, 0x11);
        assert_eq!(map.regions[1].end_address, 0x11);
        assert_eq!(map.regions[2].results[0].address(), 0x11);
        assert_eq!(map.end_address, 0x12);
        assert_eq!(map.results().count(), 2);
    }

    #[test]
    fn bitfield_runs_do_not_span_regions() {
        let regions = [
            Region::with_fields("A", Access::ReadOnly, [("X", FieldKind::Bit(1))]),
            Region::with_fields("B", Access::ReadOnly, [("Y", FieldKind::Bit(1))]),
        ];
        let map = allocate_map(&regions, 0).unwrap();
        assert_eq!(map.regions[1].results[0], bit("Y", 0, 1, 1));
        assert_eq!(map.end_address, 2);
    }

    #[test]
    fn unresolved_kind_fails() {
        let region = Region::with_fields(
            "HW",
            Access::ReadOnly,
            [
                ("ID", FieldKind::Word),
                ("UID", FieldKind::Unresolved("uint32_t".into())),
            ],
        );
        let err = Allocator::new().allocate_region(&region).unwrap_err();
        assert_eq!(
            err,
            AllocationError::UnsupportedFieldKind {
                region: "HW".into(),
                field: "UID".into(),
                order: 1,
                kind: "uint32_t".into(),
                cursor: 2,
            }
        );
    }

    #[test]
    fn out_of_range_widths_fail() {
        for width in [0, 9, 16] {
            let region = Region::with_fields("R", Access::ReadOnly, [("W", FieldKind::Bit(width))]);
            let err = Allocator::new().allocate_region(&region).unwrap_err();
            assert!(matches!(err, AllocationError::UnsupportedFieldKind { .. }));
        }
    }

    #[test]
    fn failed_map_returns_no_regions() {
        let regions = [
            Region::with_fields("OK", Access::ReadOnly, [("A", FieldKind::Byte)]),
            Region::with_fields("BAD", Access::ReadOnly, [("B", FieldKind::Word)]),
        ];
        let err = allocate_map(&regions, 0).unwrap_err();
        assert_eq!(err.region(), "BAD");
    }

    #[test]
    fn byte_past_last_address_fails() {
        let region = Region::with_fields("TOP", Access::ReadOnly, [("LAST", FieldKind::Byte)]);
        let err = allocate_map(&[region], u32::MAX).unwrap_err();
        assert_eq!(
            err,
            AllocationError::AddressOverflow {
                region: "TOP".into(),
                field: "LAST".into(),
                order: 0,
                cursor: u32::MAX,
            }
        );
    }

    #[test]
    fn last_byte_address_is_usable() {
        let region = Region::with_fields("TOP", Access::ReadOnly, [("LAST", FieldKind::Byte)]);
        let map = allocate_map(&[region], u32::MAX - 1).unwrap();
        assert_eq!(map.regions[0].results[0].address(), u32::MAX - 1);
        assert_eq!(map.end_address, u32::MAX);
    }

    #[test]
    fn word_past_last_address_fails() {
        let region = Region::with_fields("TOP", Access::ReadOnly, [("W", FieldKind::Word)]);
        let err = allocate_map(&[region], u32::MAX - 1).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::AddressOverflow {
                cursor: 0xFFFF_FFFE,
                ..
            }
        ));
    }

    #[test]
    fn bitfield_register_past_last_address_fails() {
        let region = Region::with_fields(
            "TOP",
            Access::ReadWrite,
            [("A", FieldKind::Bit(6)), ("B", FieldKind::Bit(4))],
        );
        let err = allocate_map(&[region], u32::MAX - 1).unwrap_err();
        assert_eq!(err.order(), 1);
        assert!(matches!(
            err,
            AllocationError::AddressOverflow {
                cursor: u32::MAX,
                ..
            }
        ));
    }
}
