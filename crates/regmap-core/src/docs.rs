//! Documentation table rows for a finished register map.

use crate::allocator::{AllocationResult, RegisterMap};
use crate::model::{Access, REGISTER_BITS};

/// Data columns of a documentation row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DataCells {
    /// One cell spanning all eight bit columns.
    Span(String),
    /// Per-bit field names, bit 7 first. Unused bits are `None`.
    Bits([Option<String>; 8]),
}

/// One documentation row, describing one register byte.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DocRow {
    /// Register address.
    pub address: u32,
    /// Region name on the first row of a region, `None` on the rest.
    pub group: Option<String>,
    /// Row label.
    pub name: String,
    /// Data columns.
    pub data: DataCells,
    /// Region access policy.
    pub access: Access,
}

/// Builds one row per register byte, in address order.
#[must_use]
pub fn document(map: &RegisterMap) -> Vec<DocRow> {
    let mut rows: Vec<DocRow> = Vec::new();
    for allocation in &map.regions {
        let region = &allocation.region;
        let first_row = rows.len();
        for result in &allocation.results {
            match result {
                AllocationResult::ByteField { name, address } => rows.push(DocRow {
                    address: *address,
                    group: None,
                    name: name.clone(),
                    data: DataCells::Span("8 bit".into()),
                    access: region.access,
                }),
                AllocationResult::WordField { name, address } => {
                    rows.push(DocRow {
                        address: *address,
                        group: None,
                        name: name.clone(),
                        data: DataCells::Span("16 bit".into()),
                        access: region.access,
                    });
                    rows.push(DocRow {
                        address: address + 1,
                        group: None,
                        name: format!("{name} (high)"),
                        data: DataCells::Span("16 bit".into()),
                        access: region.access,
                    });
                }
                AllocationResult::BitField {
                    name,
                    register_address,
                    bit_low,
                    bit_high,
                } => {
                    if result.opens_register() {
                        rows.push(DocRow {
                            address: *register_address,
                            group: None,
                            name: format!("{}_{register_address}", region.name),
                            data: DataCells::Bits(Default::default()),
                            access: region.access,
                        });
                    }
                    if let Some(DocRow {
                        data: DataCells::Bits(bits),
                        ..
                    }) = rows.last_mut()
                    {
                        for bit in *bit_low..*bit_high {
                            bits[usize::from(REGISTER_BITS - 1 - bit)] = Some(name.clone());
                        }
                    }
                }
            }
        }
        if let Some(row) = rows.get_mut(first_row) {
            row.group = Some(region.name.clone());
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate_map;
    use crate::model::{FieldKind, Region};

    #[test]
    fn rows_per_register_byte() {
        let regions = [Region::with_fields(
            "PWR",
            Access::ReadOnly,
            [
                ("TEMP", FieldKind::Word),
                ("ON", FieldKind::Bit(1)),
                ("MODE", FieldKind::Bit(2)),
                ("ID", FieldKind::Byte),
            ],
        )];
        let map = allocate_map(&regions, 0).unwrap();
        let rows = document(&map);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].group.as_deref(), Some("PWR"));
        assert_eq!(rows[1].group, None);
        assert_eq!(rows[1].name, "TEMP (high)");
        assert_eq!(rows[2].address, 2);
        assert_eq!(rows[2].name, "PWR_2");
        let DataCells::Bits(bits) = &rows[2].data else {
            panic!("expected bit cells");
        };
        assert_eq!(bits[7].as_deref(), Some("ON"));
        assert_eq!(bits[6].as_deref(), Some("MODE"));
        assert_eq!(bits[5].as_deref(), Some("MODE"));
        assert_eq!(bits[0], None);
        assert_eq!(rows[3].address, 3);
        assert_eq!(rows[3].data, DataCells::Span("8 bit".into()));
    }

    #[test]
    fn empty_regions_have_no_rows() {
        let regions = [Region::opaque("RAW", Access::ReadWrite)];
        let map = allocate_map(&regions, 0).unwrap();
        assert!(document(&map).is_empty());
    }
}
