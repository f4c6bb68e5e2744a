//! Core register map compiler: declaration model, address allocation, and
//! definition emission.

/// Field and region declaration model.
pub mod model;
pub use model::{Access, FieldDeclaration, FieldKind, Region, RegionKind, REGISTER_BITS};

/// Fatal allocation errors.
pub mod error;
pub use error::AllocationError;

/// Sequential address and bit-offset allocator.
pub mod allocator;
pub use allocator::{
    allocate_map, AllocationResult, Allocator, AllocatorState, RegionAllocation, RegisterMap,
};

/// Named constant emission from allocation results.
pub mod emitter;
pub use emitter::{emit, emit_map, ConstantValue, MaskStyle, NamedConstant, RegionDefinitions};

/// Documentation table rows.
pub mod docs;
pub use docs::{document, DataCells, DocRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
