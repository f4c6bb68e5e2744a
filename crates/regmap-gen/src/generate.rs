//! Top-level generation pipeline.
//!
//! 1. **Extract**: pull declaration text out of the input file
//! 2. **Parse**: tokenize and build the region model
//! 3. **Allocate**: assign addresses and bit ranges
//! 4. **Emit**: named constants and documentation rows
//! 5. **Render**: header and Markdown text
//!
//! A run either produces every artifact or fails without producing any.

use std::fmt;
use std::path::Path;

use log::{debug, info};
use regmap_core::{
    allocate_map, document, emit_map, AllocationError, AllocationResult, RegionDefinitions,
    RegionKind, RegisterMap,
};
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::parser::{parse_source, DeclarationSet, ParseError};
use crate::render::{HeaderRenderer, MarkdownRenderer, RenderInput, Renderer};
use crate::source::extract_source;

/// Where in the input a failure was traced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Input file path.
    pub file: String,
    /// 1-indexed line number.
    pub line: usize,
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Generation failure with optional source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateError {
    /// Kind of failure.
    pub kind: GenerateErrorKind,
    /// Source location if the failure maps to a declaration.
    pub location: Option<FileLocation>,
}

/// Classification of generation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateErrorKind {
    /// Input could not be read.
    #[error("I/O error: {0}")]
    Io(String),
    /// Declarations are malformed.
    #[error("parse error: {0}")]
    Parse(ParseError),
    /// Declarations cannot be laid out.
    #[error("{0}")]
    Allocation(AllocationError),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for GenerateError {}

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateWarning {
    /// The map extends past the configured register space.
    ExceedsRegisterSpace {
        /// One past the last used address.
        end_address: u32,
        /// Configured register count.
        total: u32,
    },
    /// A struct-backed region declares no fields.
    EmptyRegion {
        /// Region name.
        region: String,
    },
}

impl fmt::Display for GenerateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExceedsRegisterSpace { end_address, total } => write!(
                f,
                "register map ends at 0x{end_address:02X}, beyond the {total} configured registers"
            ),
            Self::EmptyRegion { region } => write!(f, "region {region} declares no fields"),
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    /// Allocated register map.
    pub map: RegisterMap,
    /// Named constants per region.
    pub definitions: Vec<RegionDefinitions>,
    /// Rendered C header.
    pub header: String,
    /// Rendered Markdown table.
    pub documentation: String,
    /// Non-fatal findings.
    pub warnings: Vec<GenerateWarning>,
}

/// Runs the pipeline on a file.
///
/// # Errors
///
/// Returns `GenerateError` when the file cannot be read, the declarations
/// do not parse, or allocation fails.
#[allow(clippy::result_large_err)]
pub fn generate(path: &Path, config: &GeneratorConfig) -> Result<GenerateResult, GenerateError> {
    let content = std::fs::read_to_string(path).map_err(|e| GenerateError {
        kind: GenerateErrorKind::Io(format!("{}: {e}", path.display())),
        location: None,
    })?;
    generate_from_str(path, &content, config)
}

/// Runs the pipeline on in-memory text. `path` selects header or literate
/// extraction and names the input in diagnostics.
///
/// # Errors
///
/// See [`generate`].
#[allow(clippy::result_large_err)]
pub fn generate_from_str(
    path: &Path,
    content: &str,
    config: &GeneratorConfig,
) -> Result<GenerateResult, GenerateError> {
    let source = extract_source(path, content);
    let declarations = parse_source(&source).map_err(|e| GenerateError {
        location: Some(FileLocation {
            file: source.file_path.clone(),
            line: e.location.line,
        }),
        kind: GenerateErrorKind::Parse(e),
    })?;

    let map = allocate_map(&declarations.to_regions(), config.start_address).map_err(|e| {
        GenerateError {
            location: locate_allocation_error(&declarations, &e).map(|line| FileLocation {
                file: source.file_path.clone(),
                line,
            }),
            kind: GenerateErrorKind::Allocation(e),
        }
    })?;
    narrate(&map);

    let definitions = emit_map(&map, config.mask_style);
    let rows = document(&map);
    let input = RenderInput {
        definitions: &definitions,
        rows: &rows,
    };
    let header = HeaderRenderer {
        prefix: config.prefix.clone(),
        tab_stop: config.tab_stop,
    }
    .render(&input);
    let documentation = MarkdownRenderer {
        doc_rows: config.doc_rows,
    }
    .render(&input);

    let warnings = collect_warnings(&map, config);
    Ok(GenerateResult {
        map,
        definitions,
        header,
        documentation,
        warnings,
    })
}

fn locate_allocation_error(declarations: &DeclarationSet, error: &AllocationError) -> Option<usize> {
    declarations
        .field_location(error.region(), error.order())
        .map(|location| location.line)
}

fn narrate(map: &RegisterMap) {
    for allocation in &map.regions {
        let region = &allocation.region;
        info!("Region {} (rw:{})", region.name, region.access);
        for result in &allocation.results {
            match result {
                AllocationResult::ByteField { name, address } => {
                    debug!("  {address}: {name}");
                }
                AllocationResult::WordField { name, address } => {
                    debug!("  {address}-{}: {name}", address + 1);
                }
                AllocationResult::BitField {
                    name,
                    register_address,
                    bit_low,
                    bit_high,
                } => {
                    debug!(
                        "  {register_address}: {} BIT {name} [{bit_low}..{bit_high})",
                        bit_high - bit_low
                    );
                }
            }
        }
    }
}

fn collect_warnings(map: &RegisterMap, config: &GeneratorConfig) -> Vec<GenerateWarning> {
    let mut warnings: Vec<GenerateWarning> = map
        .regions
        .iter()
        .filter(|a| a.region.kind == RegionKind::BitfieldStruct && a.region.fields.is_empty())
        .map(|a| GenerateWarning::EmptyRegion {
            region: a.region.name.clone(),
        })
        .collect();
    if let Some(total) = config.total_regs {
        if map.end_address > total {
            warnings.push(GenerateWarning::ExceedsRegisterSpace {
                end_address: map.end_address,
                total,
            });
        }
    }
    warnings
}
