//! Definition emitter: allocation results to named constants.

use crate::allocator::{AllocationResult, RegisterMap};
use crate::model::{Access, Region};

/// How bitfield masks encode their high bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MaskStyle {
    /// Inclusive range covering exactly the declared bits.
    #[default]
    Corrected,
    /// `(bit_low + width, width)`, matching headers produced by the older
    /// generator bit for bit.
    Legacy,
}

/// Value of a named constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConstantValue {
    /// A register address.
    Address(u32),
    /// An inclusive `(high, low)` bit range.
    BitRange {
        /// Highest bit position.
        high: u8,
        /// Lowest bit position.
        low: u8,
    },
}

/// A symbolic constant in a region's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NamedConstant {
    /// Constant name without any output prefix.
    pub name: String,
    /// Constant value.
    pub value: ConstantValue,
}

/// Constants for one region, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionDefinitions {
    /// Region name.
    pub region: String,
    /// Region access policy.
    pub access: Access,
    /// Constants in allocation order.
    pub constants: Vec<NamedConstant>,
}

/// Maps a region's allocation results to named constants.
///
/// Byte and word fields produce `<REGION>_<FIELD>`. A bitfield that opens a
/// register first produces `<REGION>_<ADDR>` for the register itself; every
/// bitfield then produces `<REGION>_<ADDR>_<FIELD>_MSK`. `<ADDR>` is the
/// register's decimal address.
#[must_use]
pub fn emit(region: &Region, results: &[AllocationResult], style: MaskStyle) -> Vec<NamedConstant> {
    let mut constants = Vec::with_capacity(results.len());
    for result in results {
        match result {
            AllocationResult::ByteField { name, address }
            | AllocationResult::WordField { name, address } => {
                constants.push(NamedConstant {
                    name: format!("{}_{name}", region.name),
                    value: ConstantValue::Address(*address),
                });
            }
            AllocationResult::BitField {
                name,
                register_address,
                bit_low,
                bit_high,
            } => {
                if result.opens_register() {
                    constants.push(NamedConstant {
                        name: format!("{}_{register_address}", region.name),
                        value: ConstantValue::Address(*register_address),
                    });
                }
                constants.push(NamedConstant {
                    name: format!("{}_{register_address}_{name}_MSK", region.name),
                    value: mask_range(*bit_low, *bit_high, style),
                });
            }
        }
    }
    constants
}

/// Emits definitions for every region of a map.
#[must_use]
pub fn emit_map(map: &RegisterMap, style: MaskStyle) -> Vec<RegionDefinitions> {
    map.regions
        .iter()
        .map(|allocation| RegionDefinitions {
            region: allocation.region.name.clone(),
            access: allocation.region.access,
            constants: emit(&allocation.region, &allocation.results, style),
        })
        .collect()
}

const fn mask_range(bit_low: u8, bit_high: u8, style: MaskStyle) -> ConstantValue {
    match style {
        MaskStyle::Corrected => ConstantValue::BitRange {
            high: bit_high - 1,
            low: bit_low,
        },
        MaskStyle::Legacy => ConstantValue::BitRange {
            high: bit_high,
            low: bit_high - bit_low,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate_map;
    use crate::model::FieldKind;

    fn sample_region() -> Region {
        Region::with_fields(
            "CTRL",
            Access::ReadWrite,
            [
                ("TEMP", FieldKind::Word),
                ("FLAG1", FieldKind::Bit(1)),
                ("FLAG2", FieldKind::Bit(2)),
                ("MODE", FieldKind::Bit(5)),
            ],
        )
    }

    #[test]
    fn emits_address_register_and_masks() {
        let map = allocate_map(&[sample_region()], 0).unwrap();
        let defs = emit_map(&map, MaskStyle::Corrected);
        let names: Vec<&str> = defs[0].constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "CTRL_TEMP",
                "CTRL_2",
                "CTRL_2_FLAG1_MSK",
                "CTRL_2_FLAG2_MSK",
                "CTRL_2_MODE_MSK"
            ]
        );
        assert_eq!(defs[0].constants[0].value, ConstantValue::Address(0));
        assert_eq!(defs[0].constants[1].value, ConstantValue::Address(2));
        assert_eq!(
            defs[0].constants[3].value,
            ConstantValue::BitRange { high: 2, low: 1 }
        );
        assert_eq!(
            defs[0].constants[4].value,
            ConstantValue::BitRange { high: 7, low: 3 }
        );
    }

    #[test]
    fn legacy_masks_match_old_headers() {
        let map = allocate_map(&[sample_region()], 0).unwrap();
        let defs = emit_map(&map, MaskStyle::Legacy);
        assert_eq!(
            defs[0].constants[2].value,
            ConstantValue::BitRange { high: 1, low: 1 }
        );
        assert_eq!(
            defs[0].constants[3].value,
            ConstantValue::BitRange { high: 3, low: 2 }
        );
        assert_eq!(
            defs[0].constants[4].value,
            ConstantValue::BitRange { high: 8, low: 5 }
        );
    }

    #[test]
    fn second_register_gets_its_own_address_constant() {
        let region = Region::with_fields(
            "GPIO",
            Access::ReadWrite,
            [("A", FieldKind::Bit(8)), ("B", FieldKind::Bit(1))],
        );
        let map = allocate_map(&[region], 0x80).unwrap();
        let defs = emit_map(&map, MaskStyle::Corrected);
        let names: Vec<&str> = defs[0].constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["GPIO_128", "GPIO_128_A_MSK", "GPIO_129", "GPIO_129_B_MSK"]
        );
    }

    #[test]
    fn emit_is_pure() {
        let map = allocate_map(&[sample_region()], 0).unwrap();
        assert_eq!(
            emit_map(&map, MaskStyle::Corrected),
            emit_map(&map, MaskStyle::Corrected)
        );
    }
}
